//! Bit-image rasterization
//!
//! Turns an RGBA bitmap into ESC/POS `ESC * 33` bands:
//! - the image is cut into horizontal bands of 24 rows
//! - each band is one `ESC * 33 nL nH` header followed by 3 bytes per column
//!   (top, middle, bottom 8-row strips, bit 7 = top row of the strip)
//! - each band is terminated by LF
//!
//! A pixel prints when it is fully opaque and its luminance
//! (`0.299R + 0.587G + 0.114B`) is below 128. Rows past the bottom of the
//! image in the last band never print.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, instrument};

use crate::command::{LF, bit_image_header};
use crate::error::{PrintError, PrintResult};

/// Rows per band in 24-dot bit-image mode
pub const BAND_HEIGHT: u32 = 24;

/// Luminance below which an opaque pixel prints
pub const LUMA_THRESHOLD: f32 = 128.0;

/// Widest band `ESC * nL nH` can describe
pub const MAX_PRINT_WIDTH: u32 = u16::MAX as u32;

/// Reject bitmap sizes the printer cannot take or memory cannot hold
pub fn check_print_size(width: u32, height: u32, max_pixels: u64) -> PrintResult<()> {
    if width > MAX_PRINT_WIDTH {
        return Err(PrintError::InvalidParameter(format!(
            "bitmap width {} exceeds {} dots",
            width, MAX_PRINT_WIDTH
        )));
    }
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(PrintError::InvalidParameter(format!(
            "bitmap {}x{} exceeds {} pixels",
            width, height, max_pixels
        )));
    }
    Ok(())
}

/// Scale a bitmap for printing
///
/// - With a target width, scale to that width keeping the aspect ratio.
/// - Otherwise, if either side exceeds `cap`, shrink so the longer side is `cap`.
/// - Otherwise return the image unchanged.
///
/// The output size is checked against [`check_print_size`] before any pixel
/// is allocated. Scaling is nearest-neighbour so hard edges stay hard after
/// thresholding.
pub fn resize_for_print(
    img: &RgbaImage,
    target_width: Option<u32>,
    cap: u32,
    max_pixels: u64,
) -> PrintResult<RgbaImage> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Ok(img.clone());
    }

    let (new_w, new_h) = match target_width {
        Some(tw) if tw > 0 => {
            let ratio = tw as f64 / w as f64;
            (tw, scaled(h, ratio))
        }
        _ if w > cap || h > cap => {
            let ratio = cap as f64 / w.max(h) as f64;
            (scaled(w, ratio), scaled(h, ratio))
        }
        _ => (w, h),
    };

    check_print_size(new_w, new_h, max_pixels)?;
    if (new_w, new_h) == (w, h) {
        return Ok(img.clone());
    }
    debug!(from = ?(w, h), to = ?(new_w, new_h), "resizing bitmap");
    Ok(imageops::resize(img, new_w, new_h, FilterType::Nearest))
}

fn scaled(side: u32, ratio: f64) -> u32 {
    ((side as f64 * ratio) as u32).max(1)
}

/// Whether a pixel puts ink on paper
pub fn is_ink(pixel: &Rgba<u8>) -> bool {
    let [r, g, b, a] = pixel.0;
    if a != u8::MAX {
        // Transparent and translucent pixels never print
        return false;
    }
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    luma < LUMA_THRESHOLD
}

/// Encode one column of one band: three bytes, top strip first
fn column_bytes(img: &RgbaImage, x: u32, band_top: u32) -> [u8; 3] {
    let mut out = [0u8; 3];
    for (strip, byte) in out.iter_mut().enumerate() {
        let strip_top = band_top + strip as u32 * 8;
        for bit in 0..8 {
            let y = strip_top + bit;
            if y >= img.height() {
                break;
            }
            if is_ink(img.get_pixel(x, y)) {
                *byte |= 1 << (7 - bit);
            }
        }
    }
    out
}

/// Rasterize a bitmap into `ESC * 33` bands
///
/// Line spacing is not touched here; the caller brackets the bands with
/// 24-dot spacing and its restore.
#[instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn rasterize(img: &RgbaImage) -> PrintResult<Vec<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PrintError::RenderFailure("bitmap is empty".to_string()));
    }

    let header = bit_image_header(width)?;
    let bands = height.div_ceil(BAND_HEIGHT);
    let mut data = Vec::with_capacity(bands as usize * (header.len() + width as usize * 3 + 1));

    for band in 0..bands {
        let band_top = band * BAND_HEIGHT;
        data.extend_from_slice(&header);
        for x in 0..width {
            data.extend_from_slice(&column_bytes(img, x, band_top));
        }
        data.push(LF);
    }

    debug!(bands, bytes = data.len(), "bitmap rasterized");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn band_columns(data: &[u8], width: u32, band: usize) -> &[u8] {
        let band_len = 5 + width as usize * 3 + 1;
        let start = band * band_len + 5;
        &data[start..start + width as usize * 3]
    }

    #[test]
    fn test_is_ink() {
        assert!(is_ink(&BLACK));
        assert!(!is_ink(&WHITE));
        assert!(!is_ink(&Rgba([0, 0, 0, 254])));
        assert!(!is_ink(&Rgba([0, 0, 0, 0])));
        assert!(!is_ink(&Rgba([130, 130, 130, 255])));
        assert!(is_ink(&Rgba([127, 127, 127, 255])));
    }

    #[test]
    fn test_white_image_has_no_ink() {
        let img = RgbaImage::from_pixel(10, 50, WHITE);
        let data = rasterize(&img).unwrap();
        // 50 rows -> 3 bands
        assert_eq!(data.len(), 3 * (5 + 30 + 1));
        for band in 0..3 {
            assert!(band_columns(&data, 10, band).iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_transparent_black_has_no_ink() {
        let img = RgbaImage::from_pixel(8, 24, Rgba([0, 0, 0, 0]));
        let data = rasterize(&img).unwrap();
        assert!(band_columns(&data, 8, 0).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_band_layout() {
        let img = RgbaImage::from_pixel(2, 24, BLACK);
        let data = rasterize(&img).unwrap();
        assert_eq!(&data[..5], &[0x1B, 0x2A, 33, 2, 0]);
        assert_eq!(&data[5..11], &[0xFF; 6]);
        assert_eq!(data[11], LF);
    }

    #[test]
    fn test_bit_order_top_row_is_msb() {
        let mut img = RgbaImage::from_pixel(1, 24, WHITE);
        img.put_pixel(0, 0, BLACK);
        img.put_pixel(0, 15, BLACK);
        img.put_pixel(0, 23, BLACK);
        let data = rasterize(&img).unwrap();
        assert_eq!(&data[5..8], &[0x80, 0x01, 0x01]);
    }

    #[test]
    fn test_partial_last_band_padded_with_blank() {
        let img = RgbaImage::from_pixel(1, 26, BLACK);
        let data = rasterize(&img).unwrap();
        // Second band covers rows 24..48, only rows 24 and 25 exist
        assert_eq!(band_columns(&data, 1, 1), &[0xC0, 0x00, 0x00]);
    }

    #[test]
    fn test_empty_bitmap_is_render_failure() {
        let img = RgbaImage::new(0, 0);
        assert!(matches!(rasterize(&img), Err(PrintError::RenderFailure(_))));
    }

    const MAX_PIXELS: u64 = 8_000_000;

    fn resized(img: &RgbaImage, target: Option<u32>) -> (u32, u32) {
        resize_for_print(img, target, 200, MAX_PIXELS)
            .unwrap()
            .dimensions()
    }

    #[test]
    fn test_resize_policy() {
        let img = RgbaImage::from_pixel(400, 100, WHITE);
        assert_eq!(resized(&img, None), (200, 50));
        assert_eq!(resized(&img, Some(100)), (100, 25));
        assert_eq!(resized(&img, Some(800)), (800, 200));

        let small = RgbaImage::from_pixel(120, 80, WHITE);
        assert_eq!(resized(&small, None), (120, 80));

        let tall = RgbaImage::from_pixel(100, 400, WHITE);
        assert_eq!(resized(&tall, None), (50, 200));
    }

    #[test]
    fn test_oversized_target_rejected_before_allocating() {
        let img = RgbaImage::from_pixel(1, 1000, BLACK);
        let err = resize_for_print(&img, Some(60_000), 200, MAX_PIXELS).unwrap_err();
        assert!(matches!(err, PrintError::InvalidParameter(_)));

        let err = resize_for_print(&img, Some(70_000), 200, u64::MAX).unwrap_err();
        assert!(matches!(err, PrintError::InvalidParameter(_)));
    }

    #[test]
    fn test_check_print_size() {
        assert!(check_print_size(576, 2000, MAX_PIXELS).is_ok());
        assert!(check_print_size(MAX_PRINT_WIDTH, 1, MAX_PIXELS).is_ok());
        assert!(check_print_size(MAX_PRINT_WIDTH + 1, 1, MAX_PIXELS).is_err());
        assert!(check_print_size(4000, 4000, MAX_PIXELS).is_err());
    }
}

//! Job options as submitted by the application layer
//!
//! These are the structured (JSON-shaped, camelCase) option objects each
//! entry point takes. Missing fields get the same defaults the bridge has
//! always used. Options turn into [`crate::job`] values; anything that needs
//! decoding (base64, image files) happens here.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{Align, Font, QrErrorCorrection};
use crate::config::PrinterConfig;
use crate::error::{PrintError, PrintResult};
use crate::job::{BarcodeJob, CutJob, ImageJob, QrJob, RawJob, TextJob};

fn default_text_size() -> u8 {
    1
}

fn default_barcode_width() -> u8 {
    2
}

fn default_barcode_height() -> u16 {
    100
}

fn default_qr_size() -> u8 {
    6
}

/// Options for `print_text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    pub text: String,
    #[serde(default = "default_text_size")]
    pub size: u8,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub font: Font,
    #[serde(default)]
    pub cut: bool,
    #[serde(default)]
    pub beep: bool,
    #[serde(default)]
    pub tailing_line: bool,
}

impl From<TextOptions> for TextJob {
    fn from(o: TextOptions) -> Self {
        TextJob {
            text: o.text,
            align: o.align,
            size: o.size,
            font: o.font,
            bold: o.bold,
            underline: o.underline,
            encoding: o.encoding,
            cut: o.cut,
            beep: o.beep,
            tailing_line: o.tailing_line,
        }
    }
}

/// Options for `bar_code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeOptions {
    pub text: String,
    #[serde(default = "default_barcode_width")]
    pub width: u8,
    #[serde(default = "default_barcode_height")]
    pub height: u16,
}

impl From<BarcodeOptions> for BarcodeJob {
    fn from(o: BarcodeOptions) -> Self {
        BarcodeJob {
            text: o.text,
            width: o.width,
            height: o.height,
        }
    }
}

/// Options for `qr_code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOptions {
    pub text: String,
    #[serde(default = "default_qr_size")]
    pub size: u8,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub error_correction: QrErrorCorrection,
}

impl From<QrOptions> for QrJob {
    fn from(o: QrOptions) -> Self {
        QrJob {
            text: o.text,
            size: o.size,
            align: o.align,
            error_correction: o.error_correction,
        }
    }
}

/// Options for `print_image`
///
/// Exactly one of `base64_image` and `image_path` must be set. The target
/// width is `width_px` if given, else `page_width` (mm) converted to dots,
/// else the image is only capped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    #[serde(default)]
    pub base64_image: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub align: Align,
    /// Paper width in millimetres
    #[serde(default)]
    pub page_width: Option<u32>,
    #[serde(default)]
    pub width_px: Option<u32>,
}

impl ImageOptions {
    /// Decode the image and build the job
    pub async fn into_job(self, config: &PrinterConfig) -> PrintResult<ImageJob> {
        let pixels = match (self.base64_image.as_deref(), self.image_path.as_deref()) {
            (Some(b64), None) => decode_base64_image(b64)?,
            (None, Some(path)) => read_image_file(path).await?,
            (Some(_), Some(_)) => {
                return Err(PrintError::InvalidParameter(
                    "give either base64Image or imagePath, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(PrintError::InvalidParameter(
                    "base64Image or imagePath is required".to_string(),
                ));
            }
        };

        let target_width_px = self
            .width_px
            .or_else(|| self.page_width.map(|mm| config.mm_to_dots(mm)));

        Ok(ImageJob {
            pixels,
            align: self.align,
            target_width_px,
        })
    }
}

/// Options for `print_html`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlOptions {
    pub html: String,
    #[serde(default)]
    pub align: Align,
    /// Paper width in millimetres
    #[serde(default)]
    pub page_width: Option<u32>,
    /// Fixed render height in dots
    #[serde(default)]
    pub html_height: Option<u32>,
}

impl HtmlOptions {
    /// Render width in dots
    pub fn width_px(&self, config: &PrinterConfig) -> u32 {
        config.mm_to_dots(self.page_width.unwrap_or(config.default_page_width_mm))
    }

    /// Render height in dots
    pub fn height_px(&self, config: &PrinterConfig) -> u32 {
        self.html_height.unwrap_or(config.default_html_height_px)
    }
}

/// Options for `send_raw_data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    /// ESC/POS bytes, base64-encoded
    pub data: String,
    #[serde(default)]
    pub cut: bool,
    #[serde(default)]
    pub beep: bool,
    #[serde(default)]
    pub tailing_line: bool,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl RawOptions {
    pub fn into_job(self) -> PrintResult<RawJob> {
        let bytes = decode_base64(&self.data)?;
        Ok(RawJob {
            bytes,
            cut: self.cut,
            beep: self.beep,
            tailing_line: self.tailing_line,
            encoding: self.encoding,
        })
    }
}

/// Options for `print_cut`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutOptions {
    #[serde(default)]
    pub tailing_line: bool,
    #[serde(default)]
    pub beep: bool,
}

impl From<CutOptions> for CutJob {
    fn from(o: CutOptions) -> Self {
        CutJob {
            feed_before_cut: o.tailing_line,
            beep_before_cut: o.beep,
        }
    }
}

/// Parse an options object from its JSON form
pub fn parse_options<T: DeserializeOwned>(json: &str) -> PrintResult<T> {
    Ok(serde_json::from_str(json)?)
}

/// Decode base64, tolerating line breaks and a `data:...;base64,` prefix
pub fn decode_base64(data: &str) -> PrintResult<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

fn decode_base64_image(data: &str) -> PrintResult<RgbaImage> {
    decode_image(&decode_base64(data)?)
}

async fn read_image_file(path: &str) -> PrintResult<RgbaImage> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PrintError::RenderFailure(format!("cannot read {}: {}", path, e)))?;
    decode_image(&bytes)
}

fn decode_image(bytes: &[u8]) -> PrintResult<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    debug!(width = img.width(), height = img.height(), "image decoded");
    Ok(img.to_rgba8())
}

//! ESC/POS job encoder
//!
//! Every job encodes to one self-contained byte sequence, in this order:
//! reset, alignment, font/size/style, payload, tailing feed, beep, cut.
//! Jobs always start with `ESC @`, so no job depends on what the printer did
//! before it.

use image::RgbaImage;
use tracing::{debug, instrument};

use crate::command::{self, Align, Font};
use crate::config::PrinterConfig;
use crate::encoding::resolve_charset;
use crate::error::{PrintError, PrintResult};
use crate::job::{BarcodeJob, CutJob, HtmlJob, ImageJob, PrintJob, QrJob, RawJob, TextJob};
use crate::raster::{check_print_size, rasterize, resize_for_print};

/// Lines fed by clean/off jobs
const SESSION_FEED_LINES: u8 = 5;

/// ESC/POS command builder
///
/// Accumulates command and payload bytes for a single job. Always starts with
/// the initialize command.
#[derive(Debug)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&command::INIT);
        Self { buf }
    }

    // === Text Output ===

    /// Write already-encoded text bytes
    pub fn text(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(command::LF);
        self
    }

    /// Print and feed `lines` lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&command::feed(lines));
        self
    }

    // === Alignment ===

    pub fn align(&mut self, align: Align) -> &mut Self {
        self.buf.extend_from_slice(&align.command());
        self
    }

    // === Text Style ===

    pub fn font(&mut self, font: Font) -> &mut Self {
        self.buf.extend_from_slice(&font.command());
        self
    }

    pub fn size(&mut self, size: u8) -> PrintResult<&mut Self> {
        let cmd = command::text_size(size)?;
        self.buf.extend_from_slice(&cmd);
        Ok(self)
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        let cmd = if on { command::BOLD_ON } else { command::BOLD_OFF };
        self.buf.extend_from_slice(&cmd);
        self
    }

    pub fn underline(&mut self, on: bool) -> &mut Self {
        let cmd = if on {
            command::UNDERLINE_ON
        } else {
            command::UNDERLINE_OFF
        };
        self.buf.extend_from_slice(&cmd);
        self
    }

    // === Paper Control ===

    pub fn beep(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&command::BEEP);
        self
    }

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&command::CUT_FULL);
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Reset printer to default state
    pub fn reset(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&command::INIT);
        self
    }

    /// Append the closing directives shared by text, raw and cut jobs
    fn finish(&mut self, tailing_lines: Option<u8>, beep: bool, cut: bool) -> &mut Self {
        if let Some(lines) = tailing_lines {
            self.feed(lines);
        }
        if beep {
            self.beep();
        }
        if cut {
            self.cut();
        }
        self
    }

    // === Build ===

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves [`PrintJob`]s into ESC/POS byte sequences
#[derive(Debug, Clone)]
pub struct JobEncoder {
    tailing_feed_lines: u8,
    image_size_cap: u32,
    max_bitmap_pixels: u64,
}

impl JobEncoder {
    pub fn new(config: &PrinterConfig) -> Self {
        Self {
            tailing_feed_lines: config.tailing_feed_lines,
            image_size_cap: config.image_size_cap,
            max_bitmap_pixels: config.max_bitmap_pixels,
        }
    }

    /// Encode one job into its full byte sequence
    #[instrument(skip(self, job), fields(kind = job.kind()))]
    pub fn encode(&self, job: &PrintJob) -> PrintResult<Vec<u8>> {
        let bytes = match job {
            PrintJob::Text(job) => self.encode_text(job)?,
            PrintJob::Barcode(job) => encode_barcode(job)?,
            PrintJob::Qr(job) => encode_qr(job)?,
            PrintJob::Image(job) => self.encode_image(job)?,
            PrintJob::Html(job) => self.encode_html(job)?,
            PrintJob::Raw(job) => self.encode_raw(job),
            PrintJob::Cut(job) => self.encode_cut(job),
            PrintJob::Clean => encode_clean(),
            PrintJob::Off => encode_off(),
            PrintJob::Reset => encode_reset(),
        };
        debug!(bytes = bytes.len(), "job encoded");
        Ok(bytes)
    }

    fn tailing(&self, on: bool) -> Option<u8> {
        on.then_some(self.tailing_feed_lines)
    }

    fn encode_text(&self, job: &TextJob) -> PrintResult<Vec<u8>> {
        let charset = resolve_charset(job.encoding.as_deref());

        let mut b = EscPosBuilder::new();
        b.align(job.align).font(job.font).size(job.size)?;
        if job.bold {
            b.bold(true);
        }
        if job.underline {
            b.underline(true);
        }
        b.raw(&charset.select_sequence())
            .text(&charset.encode(&job.text))
            .newline()
            .raw(&charset.deselect_sequence())
            .finish(self.tailing(job.tailing_line), job.beep, job.cut);
        Ok(b.build())
    }

    fn encode_image(&self, job: &ImageJob) -> PrintResult<Vec<u8>> {
        if let Some(0) = job.target_width_px {
            return Err(PrintError::InvalidParameter(
                "target width must be at least 1 dot".to_string(),
            ));
        }
        let resized = resize_for_print(
            &job.pixels,
            job.target_width_px,
            self.image_size_cap,
            self.max_bitmap_pixels,
        )?;
        encode_bitmap(&resized, job.align)
    }

    fn encode_html(&self, job: &HtmlJob) -> PrintResult<Vec<u8>> {
        let (width, height) = job.rendered_pixels.dimensions();
        check_print_size(width, height, self.max_bitmap_pixels)?;
        encode_bitmap(&job.rendered_pixels, job.align)
    }

    fn encode_raw(&self, job: &RawJob) -> Vec<u8> {
        let charset = resolve_charset(job.encoding.as_deref());

        let mut b = EscPosBuilder::new();
        b.raw(&charset.select_sequence())
            .raw(&job.bytes)
            .raw(&charset.deselect_sequence())
            .finish(self.tailing(job.tailing_line), job.beep, job.cut);
        b.build()
    }

    fn encode_cut(&self, job: &CutJob) -> Vec<u8> {
        let mut b = EscPosBuilder::new();
        b.finish(self.tailing(job.feed_before_cut), job.beep_before_cut, true);
        b.build()
    }
}

impl Default for JobEncoder {
    fn default() -> Self {
        Self::new(&PrinterConfig::default())
    }
}

fn encode_barcode(job: &BarcodeJob) -> PrintResult<Vec<u8>> {
    let height = command::barcode_height(job.height)?;
    let width = command::barcode_width(job.width)?;
    let symbol = command::barcode_code128(job.text.as_bytes())?;

    let mut b = EscPosBuilder::new();
    b.raw(&height)
        .raw(&width)
        .raw(&command::BARCODE_HRI_BELOW)
        .raw(&command::BARCODE_HRI_FONT_A)
        .raw(&symbol)
        .newline();
    Ok(b.build())
}

fn encode_qr(job: &QrJob) -> PrintResult<Vec<u8>> {
    let module_size = command::qr_module_size(job.size)?;
    let store = command::qr_store(job.text.as_bytes())?;

    let mut b = EscPosBuilder::new();
    b.align(job.align)
        .raw(&command::QR_MODEL_2)
        .raw(&module_size)
        .raw(&command::qr_error_correction(job.error_correction))
        .raw(&store)
        .raw(&command::QR_PRINT)
        .newline()
        .align(Align::Left);
    Ok(b.build())
}

/// Bit-image bands bracketed by 24-dot line spacing and its restore
fn encode_bitmap(img: &RgbaImage, align: Align) -> PrintResult<Vec<u8>> {
    let bands = rasterize(img)?;

    let mut b = EscPosBuilder::new();
    b.align(align)
        .raw(&command::LINE_SPACING_24)
        .raw(&bands)
        .raw(&command::LINE_SPACING_32)
        .align(Align::Left);
    Ok(b.build())
}

fn encode_clean() -> Vec<u8> {
    let mut b = EscPosBuilder::new();
    b.feed(SESSION_FEED_LINES).reset();
    b.build()
}

fn encode_off() -> Vec<u8> {
    let mut b = EscPosBuilder::new();
    b.feed(SESSION_FEED_LINES).cut();
    b.build()
}

fn encode_reset() -> Vec<u8> {
    let mut b = EscPosBuilder::new();
    b.raw(&command::CANCEL)
        .align(Align::Left)
        .raw(&command::SIZE_NORMAL)
        .bold(false)
        .underline(false)
        .font(Font::A);
    b.build()
}

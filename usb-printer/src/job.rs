//! Print job descriptions
//!
//! A [`PrintJob`] is built by the caller, consumed once by the encoder and the
//! framer, and then dropped. Jobs are plain data; all validation happens while
//! encoding.

use image::RgbaImage;

use crate::command::{Align, Font, QrErrorCorrection};

/// Formatted text
#[derive(Debug, Clone, PartialEq)]
pub struct TextJob {
    pub text: String,
    pub align: Align,
    /// Magnification, 1-8 (1, 2 and 4 use the fixed print-mode entries)
    pub size: u8,
    pub font: Font,
    pub bold: bool,
    pub underline: bool,
    /// Charset label; `None` means UTF-8
    pub encoding: Option<String>,
    pub cut: bool,
    pub beep: bool,
    pub tailing_line: bool,
}

impl TextJob {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            align: Align::Left,
            size: 1,
            font: Font::A,
            bold: false,
            underline: false,
            encoding: None,
            cut: false,
            beep: false,
            tailing_line: false,
        }
    }
}

/// CODE128 barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeJob {
    pub text: String,
    /// Module width in dots, 1-6
    pub width: u8,
    /// Bar height in dots, 1-255
    pub height: u16,
}

/// QR code (model 2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrJob {
    pub text: String,
    /// Module size in dots, 1-16
    pub size: u8,
    pub align: Align,
    pub error_correction: QrErrorCorrection,
}

/// Decoded bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub pixels: RgbaImage,
    pub align: Align,
    /// Scale to this width in dots, keeping the aspect ratio
    pub target_width_px: Option<u32>,
}

/// Bitmap produced by an HTML renderer, printed at its rendered size
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlJob {
    pub rendered_pixels: RgbaImage,
    pub align: Align,
}

/// Pre-built ESC/POS bytes, passed through verbatim
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawJob {
    pub bytes: Vec<u8>,
    pub cut: bool,
    pub beep: bool,
    pub tailing_line: bool,
    /// Charset whose printer-side selection wraps the bytes
    pub encoding: Option<String>,
}

/// Paper cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CutJob {
    pub feed_before_cut: bool,
    pub beep_before_cut: bool,
}

/// A single unit of work for the printer
#[derive(Debug, Clone, PartialEq)]
pub enum PrintJob {
    Text(TextJob),
    Barcode(BarcodeJob),
    Qr(QrJob),
    Image(ImageJob),
    Html(HtmlJob),
    Raw(RawJob),
    Cut(CutJob),
    /// Feed and reset, no cut
    Clean,
    /// Feed and cut; ends the logical session, does not power anything off
    Off,
    /// Reset, cancel pending data, restore default style
    Reset,
}

impl PrintJob {
    /// Short job name for logs and result messages
    pub fn kind(&self) -> &'static str {
        match self {
            PrintJob::Text(_) => "text",
            PrintJob::Barcode(_) => "barcode",
            PrintJob::Qr(_) => "qrcode",
            PrintJob::Image(_) => "image",
            PrintJob::Html(_) => "html",
            PrintJob::Raw(_) => "raw",
            PrintJob::Cut(_) => "cut",
            PrintJob::Clean => "clean",
            PrintJob::Off => "off",
            PrintJob::Reset => "reset",
        }
    }

    /// Whether the payload is bit-image data
    pub fn is_graphic(&self) -> bool {
        matches!(self, PrintJob::Image(_) | PrintJob::Html(_))
    }
}

impl From<TextJob> for PrintJob {
    fn from(job: TextJob) -> Self {
        PrintJob::Text(job)
    }
}

impl From<BarcodeJob> for PrintJob {
    fn from(job: BarcodeJob) -> Self {
        PrintJob::Barcode(job)
    }
}

impl From<QrJob> for PrintJob {
    fn from(job: QrJob) -> Self {
        PrintJob::Qr(job)
    }
}

impl From<ImageJob> for PrintJob {
    fn from(job: ImageJob) -> Self {
        PrintJob::Image(job)
    }
}

impl From<HtmlJob> for PrintJob {
    fn from(job: HtmlJob) -> Self {
        PrintJob::Html(job)
    }
}

impl From<RawJob> for PrintJob {
    fn from(job: RawJob) -> Self {
        PrintJob::Raw(job)
    }
}

impl From<CutJob> for PrintJob {
    fn from(job: CutJob) -> Self {
        PrintJob::Cut(job)
    }
}

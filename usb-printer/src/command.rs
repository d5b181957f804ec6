//! ESC/POS command vocabulary
//!
//! Immutable byte tables and pure builders for every command the job encoder
//! emits. Nothing here holds state; parameterised builders validate their
//! inputs and fail with [`PrintError::InvalidParameter`] before any byte is
//! produced.

use serde::{Deserialize, Serialize};

use crate::error::{PrintError, PrintResult};

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const LF: u8 = 0x0A;
pub const CAN: u8 = 0x18;

// === Hardware ===

/// ESC @ - Initialize printer
pub const INIT: [u8; 2] = [ESC, 0x40];

/// CAN - Cancel print data in page mode / pending buffer
pub const CANCEL: [u8; 1] = [CAN];

// === Alignment ===

pub const ALIGN_LEFT: [u8; 3] = [ESC, 0x61, 0x00];
pub const ALIGN_CENTER: [u8; 3] = [ESC, 0x61, 0x01];
pub const ALIGN_RIGHT: [u8; 3] = [ESC, 0x61, 0x02];

// === Text Style ===

pub const FONT_A: [u8; 3] = [ESC, 0x4D, 0x00];
pub const FONT_B: [u8; 3] = [ESC, 0x4D, 0x01];
pub const FONT_C: [u8; 3] = [ESC, 0x4D, 0x02];

pub const BOLD_ON: [u8; 3] = [ESC, 0x45, 0x01];
pub const BOLD_OFF: [u8; 3] = [ESC, 0x45, 0x00];

pub const UNDERLINE_ON: [u8; 3] = [ESC, 0x2D, 0x01];
pub const UNDERLINE_OFF: [u8; 3] = [ESC, 0x2D, 0x00];

/// ESC ! n - print mode select
pub const SIZE_NORMAL: [u8; 3] = [ESC, 0x21, 0x00];
pub const SIZE_DOUBLE: [u8; 3] = [ESC, 0x21, 0x30];
pub const SIZE_QUADRUPLE: [u8; 3] = [ESC, 0x21, 0x77];

// === Paper Control ===

/// ESC B n t - Beep n times for t * 100ms
pub const BEEP: [u8; 4] = [ESC, 0x42, 0x03, 0x01];

/// GS V 0 - Full cut
pub const CUT_FULL: [u8; 3] = [GS, 0x56, 0x00];

// === Line Spacing ===

/// ESC 3 24 - line spacing matching 24-dot bit-image bands
pub const LINE_SPACING_24: [u8; 3] = [ESC, 0x33, 24];
/// ESC 3 32 - restore the default spacing
pub const LINE_SPACING_32: [u8; 3] = [ESC, 0x33, 32];

// === Barcode ===

/// GS H 2 - HRI characters below the barcode
pub const BARCODE_HRI_BELOW: [u8; 3] = [GS, 0x48, 0x02];
/// GS f 0 - HRI font A
pub const BARCODE_HRI_FONT_A: [u8; 3] = [GS, 0x66, 0x00];

// === QR Code (GS ( k, cn = 49) ===

/// Function 165: select model 2
pub const QR_MODEL_2: [u8; 9] = [GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00];
/// Function 181: print the stored symbol
pub const QR_PRINT: [u8; 8] = [GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30];

/// Largest payload the store-data length prefix can describe
pub const QR_MAX_DATA_LEN: usize = u16::MAX as usize - 3;

/// Bit-image mode 33: 24-dot double density
pub const BIT_IMAGE_MODE_24: u8 = 33;

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn command(self) -> [u8; 3] {
        match self {
            Align::Left => ALIGN_LEFT,
            Align::Center => ALIGN_CENTER,
            Align::Right => ALIGN_RIGHT,
        }
    }
}

/// Character font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Font {
    #[default]
    A,
    B,
    C,
}

impl Font {
    pub fn command(self) -> [u8; 3] {
        match self {
            Font::A => FONT_A,
            Font::B => FONT_B,
            Font::C => FONT_C,
        }
    }
}

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl QrErrorCorrection {
    /// Level byte for function 169 (48..=51)
    pub fn level(self) -> u8 {
        match self {
            QrErrorCorrection::L => 0x30,
            QrErrorCorrection::M => 0x31,
            QrErrorCorrection::Q => 0x32,
            QrErrorCorrection::H => 0x33,
        }
    }
}

/// Text magnification
///
/// Sizes 1, 2 and 4 map to the fixed `ESC !` entries. Any other size in
/// 1..=8 is sent as a `GS !` width/height multiplier.
pub fn text_size(size: u8) -> PrintResult<Vec<u8>> {
    match size {
        1 => Ok(SIZE_NORMAL.to_vec()),
        2 => Ok(SIZE_DOUBLE.to_vec()),
        4 => Ok(SIZE_QUADRUPLE.to_vec()),
        3 | 5..=8 => custom_size(size, size),
        _ => Err(PrintError::InvalidParameter(format!(
            "text size {} out of range 1-8",
            size
        ))),
    }
}

/// GS ! n - character size with independent width/height multipliers (1-8)
pub fn custom_size(width: u8, height: u8) -> PrintResult<Vec<u8>> {
    if !(1..=8).contains(&width) || !(1..=8).contains(&height) {
        return Err(PrintError::InvalidParameter(format!(
            "character size {}x{} out of range 1-8",
            width, height
        )));
    }
    let n = ((width - 1) << 4) | (height - 1);
    Ok(vec![GS, 0x21, n])
}

/// ESC d n - Print and feed n lines
pub fn feed(lines: u8) -> [u8; 3] {
    [ESC, 0x64, lines]
}

/// ESC t n - Select character code table
pub fn code_page(table: u8) -> [u8; 3] {
    [ESC, 0x74, table]
}

/// GS h n - Barcode height in dots (1-255)
pub fn barcode_height(height: u16) -> PrintResult<[u8; 3]> {
    match u8::try_from(height) {
        Ok(h) if h >= 1 => Ok([GS, 0x68, h]),
        _ => Err(PrintError::InvalidParameter(format!(
            "barcode height {} out of range 1-255",
            height
        ))),
    }
}

/// GS w n - Barcode module width (1-6)
pub fn barcode_width(width: u8) -> PrintResult<[u8; 3]> {
    if !(1..=6).contains(&width) {
        return Err(PrintError::InvalidParameter(format!(
            "barcode width {} out of range 1-6",
            width
        )));
    }
    Ok([GS, 0x77, width])
}

/// GS k 73 n d1..dn - CODE128 symbol with its data
pub fn barcode_code128(data: &[u8]) -> PrintResult<Vec<u8>> {
    if data.is_empty() {
        return Err(PrintError::InvalidParameter(
            "barcode text must not be empty".to_string(),
        ));
    }
    if !data.is_ascii() {
        return Err(PrintError::InvalidParameter(
            "CODE128 data must be ASCII".to_string(),
        ));
    }
    let len = u8::try_from(data.len()).map_err(|_| {
        PrintError::InvalidParameter(format!(
            "barcode text length {} exceeds 255 bytes",
            data.len()
        ))
    })?;

    let mut cmd = Vec::with_capacity(data.len() + 4);
    cmd.extend_from_slice(&[GS, 0x6B, 0x49, len]);
    cmd.extend_from_slice(data);
    Ok(cmd)
}

/// Function 167: QR module size in dots (1-16)
pub fn qr_module_size(size: u8) -> PrintResult<[u8; 8]> {
    if !(1..=16).contains(&size) {
        return Err(PrintError::InvalidParameter(format!(
            "QR module size {} out of range 1-16",
            size
        )));
    }
    Ok([GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size])
}

/// Function 169: QR error correction level
pub fn qr_error_correction(level: QrErrorCorrection) -> [u8; 8] {
    [GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, level.level()]
}

/// Function 180: store QR data in the symbol storage area
///
/// `pL pH` is the little-endian length of the data plus the three
/// `cn fn m` bytes.
pub fn qr_store(data: &[u8]) -> PrintResult<Vec<u8>> {
    if data.is_empty() {
        return Err(PrintError::InvalidParameter(
            "QR text must not be empty".to_string(),
        ));
    }
    if data.len() > QR_MAX_DATA_LEN {
        return Err(PrintError::InvalidParameter(format!(
            "QR data length {} exceeds {} bytes",
            data.len(),
            QR_MAX_DATA_LEN
        )));
    }
    let len = data.len() + 3;
    let p_l = (len & 0xFF) as u8;
    let p_h = ((len >> 8) & 0xFF) as u8;

    let mut cmd = Vec::with_capacity(data.len() + 8);
    cmd.extend_from_slice(&[GS, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
    cmd.extend_from_slice(data);
    Ok(cmd)
}

/// ESC * 33 nL nH - header for one 24-dot bit-image band `width` dots wide
pub fn bit_image_header(width: u32) -> PrintResult<[u8; 5]> {
    let w = u16::try_from(width).map_err(|_| {
        PrintError::InvalidParameter(format!("bit image width {} exceeds 65535", width))
    })?;
    let [n_l, n_h] = w.to_le_bytes();
    Ok([ESC, 0x2A, BIT_IMAGE_MODE_24, n_l, n_h])
}

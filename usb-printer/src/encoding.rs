//! Text charsets for thermal printers
//!
//! Resolves a charset label from a text job into an encoder. Labels are
//! resolved with `encoding_rs` (WHATWG names), plus a built-in CP850 table
//! since `encoding_rs` does not ship DOS code pages.
//!
//! Characters the target charset cannot represent are replaced with `?`
//! instead of the HTML numeric references `encoding_rs` would emit.

use encoding_rs::Encoding;
use tracing::{debug, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// FS & - enter Chinese (double-byte) mode
const FS_CHINESE_ON: [u8; 2] = [0x1C, 0x26];
/// FS C 1 - select GBK within Chinese mode
const FS_SELECT_GBK: [u8; 3] = [0x1C, 0x43, 0x01];
/// FS . - leave Chinese mode
const FS_CHINESE_OFF: [u8; 2] = [0x1C, 0x2E];

/// ESC t table number for PC850 (Multilingual)
pub const CODE_PAGE_PC850: u8 = 2;

/// A resolved output charset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Bytes passed through as UTF-8
    Utf8,
    /// IBM code page 850
    Cp850,
    /// Any other charset `encoding_rs` knows
    Other(&'static Encoding),
}

impl Charset {
    /// Resolve a charset label, failing on names nothing recognises
    pub fn from_label(label: &str) -> PrintResult<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => return Ok(Charset::Utf8),
            "cp850" | "ibm850" | "pc850" | "850" => return Ok(Charset::Cp850),
            _ => {}
        }
        match Encoding::for_label(normalized.as_bytes()) {
            Some(enc) if enc == encoding_rs::UTF_8 => Ok(Charset::Utf8),
            // UTF-16 labels encode as UTF-8 in encoding_rs; say so instead of lying
            Some(enc) if enc.output_encoding() != enc => Err(PrintError::EncodingUnsupported(
                format!("{} cannot be used as an output encoding", enc.name()),
            )),
            Some(enc) => Ok(Charset::Other(enc)),
            None => Err(PrintError::EncodingUnsupported(label.to_string())),
        }
    }

    /// Charset name for logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Cp850 => "IBM850",
            Charset::Other(enc) => enc.name(),
        }
    }

    /// Encode text, replacing unmappable characters with `?`
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => s.as_bytes().to_vec(),
            Charset::Cp850 => encode_cp850(s),
            Charset::Other(enc) => encode_with(enc, s),
        }
    }

    /// Printer commands that must precede text in this charset
    pub fn select_sequence(&self) -> Vec<u8> {
        match self {
            Charset::Cp850 => crate::command::code_page(CODE_PAGE_PC850).to_vec(),
            Charset::Other(enc) if is_double_byte_chinese(enc) => {
                let mut seq = FS_CHINESE_ON.to_vec();
                seq.extend_from_slice(&FS_SELECT_GBK);
                seq
            }
            _ => Vec::new(),
        }
    }

    /// Printer commands that must follow text in this charset
    pub fn deselect_sequence(&self) -> Vec<u8> {
        match self {
            Charset::Other(enc) if is_double_byte_chinese(enc) => FS_CHINESE_OFF.to_vec(),
            _ => Vec::new(),
        }
    }
}

/// Resolve the charset requested by a job
///
/// Missing labels mean UTF-8. Unknown labels fall back to UTF-8 as well, with
/// a warning, so a typo in a charset name never loses a print.
#[instrument]
pub fn resolve_charset(label: Option<&str>) -> Charset {
    let Some(label) = label.filter(|l| !l.trim().is_empty()) else {
        return Charset::Utf8;
    };
    match Charset::from_label(label) {
        Ok(charset) => {
            debug!(charset = charset.name(), "charset resolved");
            charset
        }
        Err(e) => {
            warn!(error = %e, "falling back to UTF-8");
            Charset::Utf8
        }
    }
}

fn is_double_byte_chinese(enc: &'static Encoding) -> bool {
    enc == encoding_rs::GBK || enc == encoding_rs::GB18030
}

fn encode_with(enc: &'static Encoding, s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for c in s.chars() {
        let (cow, _, had_errors) = enc.encode(c.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&cow);
        }
    }
    out
}

/// Upper half (0x80-0xFF) of IBM code page 850
const CP850_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', 'ø', '£', 'Ø', '×', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '®', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐', //
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤', //
    'ð', 'Ð', 'Ê', 'Ë', 'È', 'ı', 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀', //
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', 'þ', 'Þ', 'Ú', 'Û', 'Ù', 'ý', 'Ý', '¯', '´', //
    '\u{AD}', '±', '‗', '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{A0}',
];

fn encode_cp850(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                CP850_HIGH
                    .iter()
                    .position(|&h| h == c)
                    .map_or(b'?', |i| 0x80 + i as u8)
            }
        })
        .collect()
}

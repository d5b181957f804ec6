//! Error types for the printer library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Device could not be opened or no OUT endpoint could be claimed
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Job option outside the range the printer accepts
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Requested charset is not known
    #[error("Encoding unsupported: {0}")]
    EncodingUnsupported(String),

    /// Bitmap producer returned nothing or the image could not be decoded
    #[error("Render failed: {0}")]
    RenderFailure(String),

    /// A chunk transfer failed, was short, or timed out
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    /// Unexpected underlying fault
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Serializable discriminant of [`PrintError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    InvalidParameter,
    EncodingUnsupported,
    RenderFailure,
    TransferFailure,
    Unknown,
}

impl PrintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrintError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            PrintError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            PrintError::EncodingUnsupported(_) => ErrorKind::EncodingUnsupported,
            PrintError::RenderFailure(_) => ErrorKind::RenderFailure,
            PrintError::TransferFailure(_) => ErrorKind::TransferFailure,
            PrintError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

impl From<image::ImageError> for PrintError {
    fn from(e: image::ImageError) -> Self {
        PrintError::RenderFailure(format!("image decode failed: {}", e))
    }
}

impl From<base64::DecodeError> for PrintError {
    fn from(e: base64::DecodeError) -> Self {
        PrintError::InvalidParameter(format!("invalid base64 data: {}", e))
    }
}

impl From<serde_json::Error> for PrintError {
    fn from(e: serde_json::Error) -> Self {
        PrintError::InvalidParameter(format!("invalid options: {}", e))
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

//! Uniform job outcome returned to the application layer

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PrintError};

/// Outcome of one print job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error class, present only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl PrinterResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: &PrintError) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
            error: Some(error.kind()),
        }
    }
}

impl From<PrintError> for PrinterResult {
    fn from(e: PrintError) -> Self {
        Self::failed(&e)
    }
}

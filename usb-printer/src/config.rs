//! Printer configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PRINTER_CHUNK_SIZE | 64 | bytes per transfer for command data |
//! | PRINTER_IMAGE_CHUNK_SIZE | 64 | bytes per transfer for bit-image jobs |
//! | PRINTER_CHUNK_DELAY_MS | 10 | pause between chunks |
//! | PRINTER_TRANSFER_TIMEOUT_MS | 5000 | per-chunk transfer timeout |
//! | PRINTER_RENDER_TIMEOUT_MS | 10000 | HTML render timeout |
//! | PRINTER_RESET_SETTLE_MS | 300 | wait after a reset job |
//! | PRINTER_TAILING_FEED_LINES | 5 | lines fed by `tailingLine` |
//! | PRINTER_IMAGE_SIZE_CAP | 200 | max image side without a target width |
//! | PRINTER_DOTS_PER_MM | 7.2 | mm to dots conversion |
//! | PRINTER_PAGE_WIDTH_MM | 80 | default paper width |
//! | PRINTER_HTML_HEIGHT_PX | 200 | default HTML render height |
//!
//! Unparsable values fall back to the default.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrintError, PrintResult};

/// Transport, encoder and rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrinterConfig {
    pub chunk_size: usize,
    pub image_chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub transfer_timeout_ms: u64,
    pub render_timeout_ms: u64,
    pub reset_settle_ms: u64,
    pub tailing_feed_lines: u8,
    pub image_size_cap: u32,
    /// Largest bitmap (width x height) an image or HTML job may print
    pub max_bitmap_pixels: u64,
    pub dots_per_mm: f64,
    pub default_page_width_mm: u32,
    pub default_html_height_px: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            image_chunk_size: 64,
            chunk_delay_ms: 10,
            transfer_timeout_ms: 5000,
            render_timeout_ms: 10_000,
            reset_settle_ms: 300,
            tailing_feed_lines: 5,
            image_size_cap: 200,
            max_bitmap_pixels: 8_000_000,
            dots_per_mm: 7.2,
            default_page_width_mm: 80,
            default_html_height_px: 200,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl PrinterConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables use the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            chunk_size: env_or("PRINTER_CHUNK_SIZE", d.chunk_size),
            image_chunk_size: env_or("PRINTER_IMAGE_CHUNK_SIZE", d.image_chunk_size),
            chunk_delay_ms: env_or("PRINTER_CHUNK_DELAY_MS", d.chunk_delay_ms),
            transfer_timeout_ms: env_or("PRINTER_TRANSFER_TIMEOUT_MS", d.transfer_timeout_ms),
            render_timeout_ms: env_or("PRINTER_RENDER_TIMEOUT_MS", d.render_timeout_ms),
            reset_settle_ms: env_or("PRINTER_RESET_SETTLE_MS", d.reset_settle_ms),
            tailing_feed_lines: env_or("PRINTER_TAILING_FEED_LINES", d.tailing_feed_lines),
            image_size_cap: env_or("PRINTER_IMAGE_SIZE_CAP", d.image_size_cap),
            max_bitmap_pixels: env_or("PRINTER_MAX_BITMAP_PIXELS", d.max_bitmap_pixels),
            dots_per_mm: env_or("PRINTER_DOTS_PER_MM", d.dots_per_mm),
            default_page_width_mm: env_or("PRINTER_PAGE_WIDTH_MM", d.default_page_width_mm),
            default_html_height_px: env_or("PRINTER_HTML_HEIGHT_PX", d.default_html_height_px),
        }
    }

    /// Reject settings the framer or encoder cannot work with
    pub fn validate(&self) -> PrintResult<()> {
        if self.chunk_size == 0 || self.image_chunk_size == 0 {
            return Err(PrintError::InvalidParameter(
                "chunk sizes must be at least 1 byte".to_string(),
            ));
        }
        if self.transfer_timeout_ms == 0 || self.render_timeout_ms == 0 {
            return Err(PrintError::InvalidParameter(
                "timeouts must be non-zero".to_string(),
            ));
        }
        if !(self.dots_per_mm.is_finite() && self.dots_per_mm > 0.0) {
            return Err(PrintError::InvalidParameter(format!(
                "dots per mm must be positive, got {}",
                self.dots_per_mm
            )));
        }
        if self.max_bitmap_pixels == 0 {
            return Err(PrintError::InvalidParameter(
                "bitmap pixel limit must be non-zero".to_string(),
            ));
        }
        if self.image_size_cap == 0 {
            return Err(PrintError::InvalidParameter(
                "image size cap must be at least 1 dot".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    /// Paper width in millimetres to printer dots
    pub fn mm_to_dots(&self, mm: u32) -> u32 {
        (mm as f64 * self.dots_per_mm) as u32
    }
}

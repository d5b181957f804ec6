//! Bitmap producer boundary
//!
//! HTML is rendered to pixels by an external engine. The printer core sees a
//! single request/response call bounded by a timeout.

use std::time::Duration;

use image::RgbaImage;
use tracing::{instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Renders markup into a bitmap
#[allow(async_fn_in_trait)]
pub trait BitmapProducer {
    /// Render `markup` at `width_px` dots wide
    ///
    /// `height_px` fixes the output height when given; otherwise the renderer
    /// picks one.
    async fn render(
        &self,
        markup: &str,
        width_px: u32,
        height_px: Option<u32>,
    ) -> PrintResult<RgbaImage>;
}

/// Placeholder used when no renderer is wired in; every render fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl BitmapProducer for NoRenderer {
    async fn render(&self, _markup: &str, _width: u32, _height: Option<u32>) -> PrintResult<RgbaImage> {
        Err(PrintError::RenderFailure(
            "no HTML renderer configured".to_string(),
        ))
    }
}

/// Call a producer with a timeout and reject empty bitmaps
#[instrument(skip(producer, markup), fields(markup_len = markup.len()))]
pub async fn render_with_timeout<R: BitmapProducer>(
    producer: &R,
    markup: &str,
    width_px: u32,
    height_px: Option<u32>,
    timeout: Duration,
) -> PrintResult<RgbaImage> {
    let bitmap = tokio::time::timeout(timeout, producer.render(markup, width_px, height_px))
        .await
        .map_err(|_| {
            warn!("renderer timed out");
            PrintError::RenderFailure(format!("render timed out after {:?}", timeout))
        })??;

    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(PrintError::RenderFailure(
            "renderer returned an empty bitmap".to_string(),
        ));
    }
    Ok(bitmap)
}

//! Job submission surface
//!
//! [`UsbPrinter`] ties the pieces together: options → job → bytes → chunks.
//! Every entry point returns a [`PrinterResult`]; errors never escape as
//! `Err`. Each call opens and releases its own connection, so nothing is
//! shared between jobs.

use tracing::{info, instrument, warn};

use crate::config::PrinterConfig;
use crate::encoder::JobEncoder;
use crate::error::PrintResult;
use crate::job::{HtmlJob, PrintJob};
use crate::options::{
    BarcodeOptions, CutOptions, HtmlOptions, ImageOptions, QrOptions, RawOptions, TextOptions,
};
use crate::render::{BitmapProducer, NoRenderer, render_with_timeout};
use crate::result::PrinterResult;
use crate::transport::{ByteSink, Framer};

/// Printer front end over a byte sink and an optional HTML renderer
#[derive(Debug)]
pub struct UsbPrinter<S, R = NoRenderer> {
    sink: S,
    renderer: R,
    config: PrinterConfig,
    encoder: JobEncoder,
    framer: Framer,
}

impl<S: ByteSink> UsbPrinter<S> {
    /// Create a printer without HTML support
    pub fn new(sink: S, config: PrinterConfig) -> PrintResult<Self> {
        config.validate()?;
        Ok(Self {
            sink,
            renderer: NoRenderer,
            encoder: JobEncoder::new(&config),
            framer: Framer::new(&config),
            config,
        })
    }
}

impl<S: ByteSink, R: BitmapProducer> UsbPrinter<S, R> {
    /// Attach an HTML renderer
    pub fn with_renderer<R2: BitmapProducer>(self, renderer: R2) -> UsbPrinter<S, R2> {
        UsbPrinter {
            sink: self.sink,
            renderer,
            config: self.config,
            encoder: self.encoder,
            framer: self.framer,
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Encode and deliver one job
    #[instrument(skip(self, job), fields(kind = job.kind()))]
    pub async fn submit(&self, job: PrintJob, device: &S::Device) -> PrinterResult {
        let kind = job.kind();
        match self.run(&job, device).await {
            Ok(sent) => {
                info!(sent, "job printed");
                PrinterResult::ok(format!("{} job sent ({} bytes)", kind, sent))
            }
            Err(e) => {
                warn!(error = %e, "job failed");
                PrinterResult::failed(&e)
            }
        }
    }

    async fn run(&self, job: &PrintJob, device: &S::Device) -> PrintResult<usize> {
        let data = self.encoder.encode(job)?;
        let chunk_size = if job.is_graphic() {
            self.config.image_chunk_size
        } else {
            self.config.chunk_size
        };
        let settle = matches!(job, PrintJob::Reset).then(|| self.config.reset_settle());
        self.framer
            .deliver(&self.sink, device, &data, chunk_size, settle)
            .await
    }

    pub async fn print_text(&self, options: TextOptions, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Text(options.into()), device).await
    }

    pub async fn bar_code(&self, options: BarcodeOptions, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Barcode(options.into()), device).await
    }

    pub async fn qr_code(&self, options: QrOptions, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Qr(options.into()), device).await
    }

    /// Print a base64-encoded or on-disk image
    pub async fn print_image(&self, options: ImageOptions, device: &S::Device) -> PrinterResult {
        match options.into_job(&self.config).await {
            Ok(job) => self.submit(PrintJob::Image(job), device).await,
            Err(e) => PrinterResult::failed(&e),
        }
    }

    /// Render HTML with the attached renderer and print the bitmap
    #[instrument(skip(self, options), fields(html_len = options.html.len()))]
    pub async fn print_html(&self, options: HtmlOptions, device: &S::Device) -> PrinterResult {
        let rendered = render_with_timeout(
            &self.renderer,
            &options.html,
            options.width_px(&self.config),
            Some(options.height_px(&self.config)),
            self.config.render_timeout(),
        )
        .await;

        match rendered {
            Ok(rendered_pixels) => {
                let job = HtmlJob {
                    rendered_pixels,
                    align: options.align,
                };
                self.submit(PrintJob::Html(job), device).await
            }
            Err(e) => {
                warn!(error = %e, "HTML render failed");
                PrinterResult::failed(&e)
            }
        }
    }

    /// Send base64-encoded ESC/POS bytes
    pub async fn send_raw_data(&self, options: RawOptions, device: &S::Device) -> PrinterResult {
        match options.into_job() {
            Ok(job) => self.submit(PrintJob::Raw(job), device).await,
            Err(e) => PrinterResult::failed(&e),
        }
    }

    pub async fn print_cut(&self, options: CutOptions, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Cut(options.into()), device).await
    }

    pub async fn clean(&self, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Clean, device).await
    }

    pub async fn off(&self, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Off, device).await
    }

    pub async fn reset(&self, device: &S::Device) -> PrinterResult {
        self.submit(PrintJob::Reset, device).await
    }
}

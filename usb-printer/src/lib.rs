//! # usb-printer
//!
//! ESC/POS thermal printer driver: encodes print jobs and streams them to a
//! USB (or network) printer in small chunks.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command encoding (text, barcode, QR, cut, beep, reset)
//! - Character set conversion (CP850, GBK, any WHATWG label)
//! - Image rasterization to 24-dot bit-image bands
//! - Chunked delivery over any [`ByteSink`] (USB bulk, TCP 9100)
//!
//! Device discovery and HTML layout stay outside: the host supplies a
//! [`ByteSink`] for its USB stack and, optionally, a [`BitmapProducer`].
//!
//! ## Example
//!
//! ```ignore
//! use usb_printer::{NetworkSink, PrinterConfig, TextOptions, UsbPrinter, parse_options};
//!
//! let printer = UsbPrinter::new(NetworkSink::new(), PrinterConfig::from_env())?;
//! let addr = NetworkSink::parse_addr("192.168.1.100")?;
//!
//! let options: TextOptions = parse_options(r#"{"text": "Hello", "cut": true}"#)?;
//! let result = printer.print_text(options, &addr).await;
//! assert!(result.success);
//! ```

pub mod command;
mod config;
mod encoder;
mod encoding;
mod error;
mod job;
mod network;
mod options;
pub mod raster;
mod render;
mod result;
mod service;
mod transport;

// Re-exports
pub use command::{Align, Font, QrErrorCorrection};
pub use config::PrinterConfig;
pub use encoder::{EscPosBuilder, JobEncoder};
pub use encoding::{Charset, resolve_charset};
pub use error::{ErrorKind, PrintError, PrintResult};
pub use job::{BarcodeJob, CutJob, HtmlJob, ImageJob, PrintJob, QrJob, RawJob, TextJob};
pub use network::NetworkSink;
pub use options::{
    BarcodeOptions, CutOptions, HtmlOptions, ImageOptions, QrOptions, RawOptions, TextOptions,
    decode_base64, parse_options,
};
pub use render::{BitmapProducer, NoRenderer, render_with_timeout};
pub use result::PrinterResult;
pub use service::UsbPrinter;
pub use transport::{
    ByteSink, Direction, Endpoint, EndpointDescriptor, Framer, InterfaceDescriptor,
};

//! Recording byte sink shared by the integration tests

#![allow(dead_code)]

use std::sync::{Mutex, Once};
use std::time::Duration;

use tokio::time::Instant;
use usb_printer::{
    ByteSink, Direction, Endpoint, EndpointDescriptor, InterfaceDescriptor, PrintError,
    PrintResult, PrinterConfig,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (`RUST_LOG=debug` to see it)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Config without inter-chunk delay, so tests do not sleep
pub fn fast_config() -> PrinterConfig {
    PrinterConfig {
        chunk_delay_ms: 0,
        reset_settle_ms: 0,
        ..PrinterConfig::default()
    }
}

/// Something the sink was asked to do, with the (tokio) time it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(String),
    Claim(u8),
    Transfer(usize),
    Release(u8),
    Close,
}

/// Byte sink recording every call and every chunk it accepts
pub struct RecordingSink {
    pub interfaces: Vec<InterfaceDescriptor>,
    pub claimable: Vec<u8>,
    pub fail_open: bool,
    pub fail_at_chunk: Option<usize>,
    pub events: Mutex<Vec<(Instant, Event)>>,
    pub chunks: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    /// A printer with one interface holding one bulk OUT endpoint
    pub fn printer() -> Self {
        Self {
            interfaces: vec![InterfaceDescriptor {
                number: 0,
                endpoints: vec![
                    EndpointDescriptor {
                        address: 0x81,
                        direction: Direction::In,
                    },
                    EndpointDescriptor {
                        address: 0x01,
                        direction: Direction::Out,
                    },
                ],
            }],
            claimable: vec![0],
            fail_open: false,
            fail_at_chunk: None,
            events: Mutex::new(Vec::new()),
            chunks: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push((Instant::now(), event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, Event)> {
        self.events.lock().unwrap().clone()
    }

    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().unwrap().clone()
    }

    /// Everything the printer received, in order
    pub fn received(&self) -> Vec<u8> {
        self.chunks.lock().unwrap().concat()
    }
}

impl ByteSink for RecordingSink {
    type Device = str;
    type Connection = ();

    async fn open(&self, device: &str) -> PrintResult<()> {
        self.record(Event::Open(device.to_string()));
        if self.fail_open {
            return Err(PrintError::Unknown("LIBUSB_ERROR_ACCESS".into()));
        }
        Ok(())
    }

    fn interfaces(&self, _conn: &()) -> Vec<InterfaceDescriptor> {
        self.interfaces.clone()
    }

    async fn claim_interface(&self, _conn: &mut (), interface: u8) -> PrintResult<()> {
        self.record(Event::Claim(interface));
        if self.claimable.contains(&interface) {
            Ok(())
        } else {
            Err(PrintError::DeviceUnavailable(format!(
                "interface {} busy",
                interface
            )))
        }
    }

    async fn transfer(
        &self,
        _conn: &mut (),
        _endpoint: Endpoint,
        data: &[u8],
        _timeout: Duration,
    ) -> PrintResult<usize> {
        self.record(Event::Transfer(data.len()));
        let mut chunks = self.chunks.lock().unwrap();
        if self.fail_at_chunk == Some(chunks.len()) {
            return Err(PrintError::TransferFailure("LIBUSB_ERROR_PIPE".into()));
        }
        chunks.push(data.to_vec());
        Ok(data.len())
    }

    async fn release_interface(&self, _conn: &mut (), interface: u8) -> PrintResult<()> {
        self.record(Event::Release(interface));
        Ok(())
    }

    async fn close(&self, _conn: ()) {
        self.record(Event::Close);
    }
}

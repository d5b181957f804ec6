//! Transport framing
//!
//! Delivers an encoded job through a [`ByteSink`]:
//! - open the device and claim exactly one OUT endpoint, trying every
//!   interface/endpoint combination in order
//! - send the bytes in fixed-size chunks, strictly in order, pausing briefly
//!   between chunks
//! - abort on the first failed, short or timed-out chunk
//! - release the interface and close the connection on every path

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::PrinterConfig;
use crate::error::{PrintError, PrintResult};

/// Endpoint direction as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// One endpoint of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub direction: Direction,
}

/// One interface of a device and its endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// A claimed OUT endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub interface: u8,
    pub address: u8,
}

/// Byte sink collaborator (USB bulk transport or similar)
///
/// Implementations only move bytes; endpoint selection, chunking, timing and
/// cleanup ordering live in [`Framer`].
#[allow(async_fn_in_trait)]
pub trait ByteSink {
    /// Reference to the target device (product id, address, path...)
    type Device: fmt::Debug + ?Sized;
    /// An opened device
    type Connection;

    /// Open the device
    async fn open(&self, device: &Self::Device) -> PrintResult<Self::Connection>;

    /// Interfaces exposed by the opened device, in enumeration order
    fn interfaces(&self, conn: &Self::Connection) -> Vec<InterfaceDescriptor>;

    /// Claim an interface for exclusive use
    async fn claim_interface(&self, conn: &mut Self::Connection, interface: u8) -> PrintResult<()>;

    /// Transfer bytes to an OUT endpoint, returning how many were accepted
    async fn transfer(
        &self,
        conn: &mut Self::Connection,
        endpoint: Endpoint,
        data: &[u8],
        timeout: Duration,
    ) -> PrintResult<usize>;

    /// Release a claimed interface
    async fn release_interface(&self, conn: &mut Self::Connection, interface: u8)
    -> PrintResult<()>;

    /// Close the connection
    async fn close(&self, conn: Self::Connection);
}

/// Splits byte streams into chunks and drives them through a [`ByteSink`]
#[derive(Debug, Clone)]
pub struct Framer {
    chunk_delay: Duration,
    transfer_timeout: Duration,
}

impl Framer {
    pub fn new(config: &PrinterConfig) -> Self {
        Self {
            chunk_delay: config.chunk_delay(),
            transfer_timeout: config.transfer_timeout(),
        }
    }

    /// Claim the first OUT endpoint whose interface can be claimed
    #[instrument(skip_all)]
    pub async fn claim_output_endpoint<S: ByteSink>(
        &self,
        sink: &S,
        conn: &mut S::Connection,
    ) -> PrintResult<Endpoint> {
        let interfaces = sink.interfaces(conn);
        debug!(count = interfaces.len(), "probing interfaces");

        for iface in &interfaces {
            let outs = iface
                .endpoints
                .iter()
                .filter(|ep| ep.direction == Direction::Out);
            for ep in outs {
                match sink.claim_interface(conn, iface.number).await {
                    Ok(()) => {
                        info!(
                            interface = iface.number,
                            endpoint = ep.address,
                            "claimed OUT endpoint"
                        );
                        return Ok(Endpoint {
                            interface: iface.number,
                            address: ep.address,
                        });
                    }
                    Err(e) => {
                        warn!(interface = iface.number, error = %e, "failed to claim interface");
                    }
                }
            }
        }

        Err(PrintError::DeviceUnavailable(format!(
            "no claimable OUT endpoint across {} interface(s)",
            interfaces.len()
        )))
    }

    /// Send `data` in order, `chunk_size` bytes at a time
    ///
    /// Returns the number of bytes sent. The first failed chunk aborts the
    /// whole transfer; nothing after it is sent.
    #[instrument(skip(self, sink, conn, data), fields(bytes = data.len()))]
    pub async fn send_chunks<S: ByteSink>(
        &self,
        sink: &S,
        conn: &mut S::Connection,
        endpoint: Endpoint,
        data: &[u8],
        chunk_size: usize,
    ) -> PrintResult<usize> {
        if chunk_size == 0 {
            return Err(PrintError::InvalidParameter(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }

        let total = data.len();
        let mut offset = 0;
        debug!(chunk_size, "sending {} bytes", total);

        for chunk in data.chunks(chunk_size) {
            let sent = tokio::time::timeout(
                self.transfer_timeout,
                sink.transfer(conn, endpoint, chunk, self.transfer_timeout),
            )
            .await
            .map_err(|_| {
                PrintError::TransferFailure(format!(
                    "chunk at offset {} timed out after {:?}",
                    offset, self.transfer_timeout
                ))
            })?
            .map_err(|e| match e {
                PrintError::TransferFailure(_) => e,
                other => PrintError::TransferFailure(format!(
                    "chunk at offset {} failed: {}",
                    offset, other
                )),
            });

            let sent = match sent {
                Ok(n) if n == chunk.len() => n,
                Ok(n) => {
                    error!(offset, sent = n, expected = chunk.len(), "short transfer");
                    return Err(PrintError::TransferFailure(format!(
                        "chunk at offset {} sent {} of {} bytes",
                        offset,
                        n,
                        chunk.len()
                    )));
                }
                Err(e) => {
                    error!(offset, error = %e, "chunk transfer failed");
                    return Err(e);
                }
            };

            trace!(offset, sent, "chunk sent");
            offset += sent;

            if offset < total && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        debug!("all chunks sent");
        Ok(offset)
    }

    /// Deliver one job's bytes to a device
    ///
    /// Opens the device, claims an endpoint, sends the chunks, optionally
    /// waits `settle` for the printer to process them, then releases the
    /// interface and closes the connection whatever the outcome.
    #[instrument(skip(self, sink, data), fields(bytes = data.len()))]
    pub async fn deliver<S: ByteSink>(
        &self,
        sink: &S,
        device: &S::Device,
        data: &[u8],
        chunk_size: usize,
        settle: Option<Duration>,
    ) -> PrintResult<usize> {
        let mut conn = sink.open(device).await.map_err(|e| match e {
            PrintError::DeviceUnavailable(_) => e,
            other => PrintError::DeviceUnavailable(other.to_string()),
        })?;

        let endpoint = match self.claim_output_endpoint(sink, &mut conn).await {
            Ok(ep) => ep,
            Err(e) => {
                sink.close(conn).await;
                return Err(e);
            }
        };

        let result = self
            .send_chunks(sink, &mut conn, endpoint, data, chunk_size)
            .await;

        if result.is_ok()
            && let Some(wait) = settle
        {
            tokio::time::sleep(wait).await;
        }

        if let Err(e) = sink.release_interface(&mut conn, endpoint.interface).await {
            warn!(interface = endpoint.interface, error = %e, "failed to release interface");
        }
        sink.close(conn).await;

        match &result {
            Ok(sent) => info!(sent, "delivery complete"),
            Err(e) => error!(error = %e, "delivery aborted"),
        }
        result
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(&PrinterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Sink with scripted interfaces and transfer results
    #[derive(Default)]
    struct ScriptedSink {
        interfaces: Vec<InterfaceDescriptor>,
        claimable: Vec<u8>,
        fail_at_chunk: Option<usize>,
        short_at_chunk: Option<usize>,
        hang_at_chunk: Option<usize>,
        log: Mutex<Vec<String>>,
        chunks: Mutex<Vec<Vec<u8>>>,
        attempts: Mutex<Vec<Instant>>,
    }

    impl ScriptedSink {
        fn single_out() -> Self {
            Self {
                interfaces: vec![InterfaceDescriptor {
                    number: 0,
                    endpoints: vec![EndpointDescriptor {
                        address: 0x01,
                        direction: Direction::Out,
                    }],
                }],
                claimable: vec![0],
                ..Default::default()
            }
        }

        fn log(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }
    }

    impl ByteSink for ScriptedSink {
        type Device = str;
        type Connection = ();

        async fn open(&self, device: &str) -> PrintResult<()> {
            self.log(format!("open {}", device));
            Ok(())
        }

        fn interfaces(&self, _conn: &()) -> Vec<InterfaceDescriptor> {
            self.interfaces.clone()
        }

        async fn claim_interface(&self, _conn: &mut (), interface: u8) -> PrintResult<()> {
            self.log(format!("claim {}", interface));
            if self.claimable.contains(&interface) {
                Ok(())
            } else {
                Err(PrintError::DeviceUnavailable("busy".into()))
            }
        }

        async fn transfer(
            &self,
            _conn: &mut (),
            _endpoint: Endpoint,
            data: &[u8],
            _timeout: Duration,
        ) -> PrintResult<usize> {
            let index = self.chunks.lock().unwrap().len();
            self.attempts.lock().unwrap().push(Instant::now());
            if self.hang_at_chunk == Some(index) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_at_chunk == Some(index) {
                return Err(PrintError::TransferFailure("bulk transfer returned -1".into()));
            }
            self.chunks.lock().unwrap().push(data.to_vec());
            if self.short_at_chunk == Some(index) {
                return Ok(data.len() - 1);
            }
            Ok(data.len())
        }

        async fn release_interface(&self, _conn: &mut (), interface: u8) -> PrintResult<()> {
            self.log(format!("release {}", interface));
            Ok(())
        }

        async fn close(&self, _conn: ()) {
            self.log("close");
        }
    }

    fn framer() -> Framer {
        Framer {
            chunk_delay: Duration::ZERO,
            transfer_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_chunks_reassemble() {
        let sink = ScriptedSink::single_out();
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();

        let sent = framer().deliver(&sink, "dev", &data, 64, None).await.unwrap();
        assert_eq!(sent, 1000);

        let chunks = sink.chunks.lock().unwrap();
        assert_eq!(chunks.len(), 16);
        assert!(chunks.iter().all(|c| c.len() <= 64));
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_failed_chunk_aborts_and_cleans_up() {
        let sink = ScriptedSink {
            fail_at_chunk: Some(2),
            ..ScriptedSink::single_out()
        };
        let data = vec![0xAA; 640];

        let err = framer()
            .deliver(&sink, "dev", &data, 64, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::TransferFailure(_)));
        assert_eq!(sink.chunks.lock().unwrap().len(), 2);

        let log = sink.log.lock().unwrap();
        assert_eq!(log.as_slice(), ["open dev", "claim 0", "release 0", "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_chunk_times_out_and_cleans_up() {
        let sink = ScriptedSink {
            hang_at_chunk: Some(1),
            ..ScriptedSink::single_out()
        };
        let data = vec![0x11; 200];

        let err = framer()
            .deliver(&sink, "dev", &data, 64, None)
            .await
            .unwrap_err();
        assert!(matches!(&err, PrintError::TransferFailure(m) if m.contains("timed out")));
        assert_eq!(sink.chunks.lock().unwrap().len(), 1);
        assert_eq!(sink.attempts.lock().unwrap().len(), 2);

        let log = sink.log.lock().unwrap();
        assert_eq!(log.as_slice(), ["open dev", "claim 0", "release 0", "close"]);
    }

    #[tokio::test]
    async fn test_short_transfer_aborts() {
        let sink = ScriptedSink {
            short_at_chunk: Some(0),
            ..ScriptedSink::single_out()
        };
        let data = vec![0x22; 200];

        let err = framer()
            .deliver(&sink, "dev", &data, 64, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::TransferFailure(_)));
        assert_eq!(sink.attempts.lock().unwrap().len(), 1);

        let log = sink.log.lock().unwrap();
        assert_eq!(log.as_slice(), ["open dev", "claim 0", "release 0", "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_are_paced() {
        let sink = ScriptedSink::single_out();
        let framer = Framer::new(&PrinterConfig {
            chunk_delay_ms: 10,
            ..PrinterConfig::default()
        });
        let data = vec![0x33; 150];

        let start = Instant::now();
        let sent = framer.deliver(&sink, "dev", &data, 64, None).await.unwrap();
        let elapsed = start.elapsed();
        assert_eq!(sent, 150);

        let attempts = sink.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(10));
        }
        // two gaps, nothing after the last chunk
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_claim_skips_in_only_and_busy_interfaces() {
        let sink = ScriptedSink {
            interfaces: vec![
                InterfaceDescriptor {
                    number: 0,
                    endpoints: vec![EndpointDescriptor {
                        address: 0x81,
                        direction: Direction::In,
                    }],
                },
                InterfaceDescriptor {
                    number: 1,
                    endpoints: vec![EndpointDescriptor {
                        address: 0x02,
                        direction: Direction::Out,
                    }],
                },
                InterfaceDescriptor {
                    number: 2,
                    endpoints: vec![
                        EndpointDescriptor {
                            address: 0x83,
                            direction: Direction::In,
                        },
                        EndpointDescriptor {
                            address: 0x03,
                            direction: Direction::Out,
                        },
                    ],
                },
            ],
            claimable: vec![2],
            ..Default::default()
        };

        let mut conn = sink.open("dev").await.unwrap();
        let ep = framer()
            .claim_output_endpoint(&sink, &mut conn)
            .await
            .unwrap();
        assert_eq!(
            ep,
            Endpoint {
                interface: 2,
                address: 0x03
            }
        );
    }

    #[tokio::test]
    async fn test_no_claimable_endpoint_sends_nothing() {
        let sink = ScriptedSink {
            claimable: vec![],
            ..ScriptedSink::single_out()
        };

        let err = framer()
            .deliver(&sink, "dev", b"hello", 64, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::DeviceUnavailable(_)));
        assert!(sink.chunks.lock().unwrap().is_empty());
        assert_eq!(sink.log.lock().unwrap().last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let sink = ScriptedSink::single_out();
        let err = framer()
            .deliver(&sink, "dev", b"x", 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::InvalidParameter(_)));
    }
}

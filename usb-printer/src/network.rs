//! Network byte sink
//!
//! Most thermal printers also accept raw ESC/POS on TCP port 9100. The socket
//! is presented to the framer as a device with one interface holding one OUT
//! endpoint, so network printers go through the same chunking and cleanup as
//! USB ones.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::transport::{ByteSink, Direction, Endpoint, EndpointDescriptor, InterfaceDescriptor};

/// Raw TCP printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Address of the single pseudo OUT endpoint
const SOCKET_ENDPOINT: u8 = 0x01;

/// Byte sink writing to network printers
#[derive(Debug, Clone)]
pub struct NetworkSink {
    connect_timeout: Duration,
}

impl NetworkSink {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parse "host:port", or a bare host on the default port
    pub fn parse_addr(addr: &str) -> PrintResult<SocketAddr> {
        let with_port = if addr.contains(':') {
            addr.to_string()
        } else {
            format!("{}:{}", addr, DEFAULT_PORT)
        };
        with_port
            .parse()
            .map_err(|_| PrintError::InvalidParameter(format!("Invalid address: {}", addr)))
    }

    /// Check if the printer accepts connections
    #[instrument(skip(self))]
    pub async fn is_online(&self, addr: SocketAddr) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

impl Default for NetworkSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSink for NetworkSink {
    type Device = SocketAddr;
    type Connection = TcpStream;

    #[instrument(skip(self))]
    async fn open(&self, addr: &SocketAddr) -> PrintResult<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| PrintError::DeviceUnavailable(format!("Connection timeout: {}", addr)))?
            .map_err(|e| PrintError::DeviceUnavailable(format!("{}: {}", addr, e)))?;
        // Small chunks should leave immediately
        stream
            .set_nodelay(true)
            .map_err(|e| PrintError::DeviceUnavailable(format!("{}: {}", addr, e)))?;
        info!("Connected to printer");
        Ok(stream)
    }

    fn interfaces(&self, _conn: &TcpStream) -> Vec<InterfaceDescriptor> {
        vec![InterfaceDescriptor {
            number: 0,
            endpoints: vec![EndpointDescriptor {
                address: SOCKET_ENDPOINT,
                direction: Direction::Out,
            }],
        }]
    }

    async fn claim_interface(&self, _conn: &mut TcpStream, _interface: u8) -> PrintResult<()> {
        Ok(())
    }

    async fn transfer(
        &self,
        conn: &mut TcpStream,
        _endpoint: Endpoint,
        data: &[u8],
        timeout: Duration,
    ) -> PrintResult<usize> {
        tokio::time::timeout(timeout, conn.write_all(data))
            .await
            .map_err(|_| PrintError::TransferFailure(format!("Write timeout after {:?}", timeout)))?
            .map_err(|e| PrintError::TransferFailure(format!("Write failed: {}", e)))?;
        Ok(data.len())
    }

    async fn release_interface(&self, conn: &mut TcpStream, _interface: u8) -> PrintResult<()> {
        conn.flush()
            .await
            .map_err(|e| PrintError::TransferFailure(format!("Flush failed: {}", e)))
    }

    async fn close(&self, mut conn: TcpStream) {
        if let Err(e) = conn.shutdown().await {
            warn!(error = %e, "Socket shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Framer;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_addr() {
        assert_eq!(NetworkSink::parse_addr("192.168.1.100").unwrap().port(), 9100);
        assert_eq!(
            NetworkSink::parse_addr("192.168.1.100:9101").unwrap().port(),
            9101
        );
        assert!(NetworkSink::parse_addr("invalid").is_err());
    }

    #[tokio::test]
    async fn test_deliver_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let data: Vec<u8> = (0..200u8).collect();
        let sent = Framer::default()
            .deliver(&NetworkSink::new(), &addr, &data, 64, None)
            .await
            .unwrap();
        assert_eq!(sent, 200);
        assert_eq!(server.await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sink = NetworkSink::new();
        assert!(sink.is_online(addr).await);

        drop(listener);
        assert!(!sink.is_online(addr).await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_device_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Framer::default()
            .deliver(&NetworkSink::new(), &addr, b"x", 64, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrintError::DeviceUnavailable(_)));
    }
}

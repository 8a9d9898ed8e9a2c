//! Byte-level I/O used by [crate::client::Client].
//!
//! A transport knows nothing about rcon framing; it moves raw bytes. The
//! client does the two-step read (size prefix, then the rest of the frame)
//! on top of [Transport::receive_exactly].
use std::{future::Future, time::Duration};

use async_trait::async_trait;
use log::{debug, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::error::RconError;

/// A duplex byte stream. Implementations own their connection exclusively and
/// release it when dropped.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection. Returns `Ok(false)` without doing anything if the
    /// transport is already connected.
    async fn connect(&mut self, host: &str, port: u16) -> Result<bool, RconError>;

    fn is_connected(&self) -> bool;

    /// Write all of `bytes`.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), RconError>;

    /// Block until exactly `n` bytes have been read.
    async fn receive_exactly(&mut self, n: usize) -> Result<Vec<u8>, RconError>;

    /// Close the connection. Closing a closed transport is a no-op.
    async fn close(&mut self) -> Result<(), RconError>;
}

/// [Transport] over a tokio [TcpStream].
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound connect, every write and every read by `duration`. Without this,
    /// operations wait as long as the OS lets them.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    fn stream(&mut self) -> Result<&mut TcpStream, RconError> {
        self.stream.as_mut().ok_or(RconError::NotConnected)
    }
}

async fn timed<F, T>(duration: Option<Duration>, fut: F) -> Result<T, RconError>
where
    F: Future<Output = Result<T, RconError>>,
{
    match duration {
        Some(duration) => timeout(duration, fut).await?,
        None => fut.await,
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, host: &str, port: u16) -> Result<bool, RconError> {
        if self.is_connected() {
            return Ok(false);
        }

        let stream = timed(self.timeout, async {
            TcpStream::connect((host, port))
                .await
                .map_err(RconError::UnreachableHost)
        })
        .await?;
        // rcon frames are small and latency-bound
        stream.set_nodelay(true).map_err(RconError::UnreachableHost)?;

        debug!("opened tcp stream to {}:{}", host, port);
        self.stream = Some(stream);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), RconError> {
        let duration = self.timeout;
        let stream = self.stream()?;
        timed(duration, async {
            stream.write_all(bytes).await.map_err(RconError::SendError)
        })
        .await?;
        trace!("wrote {} bytes", bytes.len());
        Ok(())
    }

    async fn receive_exactly(&mut self, n: usize) -> Result<Vec<u8>, RconError> {
        let duration = self.timeout;
        let stream = self.stream()?;
        let mut buf = vec![0; n];
        timed(duration, async {
            stream
                .read_exact(&mut buf)
                .await
                .map_err(RconError::ReceiveError)
        })
        .await?;
        trace!("read {} bytes", n);
        Ok(buf)
    }

    async fn close(&mut self) -> Result<(), RconError> {
        if let Some(mut stream) = self.stream.take() {
            // the socket is released when `stream` drops, shutdown errors only
            // mean the peer went away first
            if let Err(e) = stream.shutdown().await {
                debug!("error shutting down tcp stream: {}", e);
            }
            debug!("closed tcp stream");
        }
        Ok(())
    }
}

//! HTTP/1.0 over the provider's Unix domain socket.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use hivemesh_provider_api::{split_body, Request};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use super::{ChannelError, ControlChannel};

/// Stateless, one-connection-per-request transport.
///
/// Framing on the read side is **close-delimited**: the provider always
/// closes the connection after responding, and the channel accumulates bytes
/// until it does. There is no `Content-Length`-aware read. This is a
/// compatibility constraint of the provider, not a style choice — porting
/// this channel to a transport with persistent connections requires proper
/// length-based framing first.
#[derive(Debug, Clone)]
pub struct UnixChannel {
    socket_path: PathBuf,
    io_timeout: Duration,
}

impl UnixChannel {
    /// Create a channel for the given socket path.
    ///
    /// `io_timeout` bounds the connect, the write, and each read separately
    /// (the provider's shell uses ≈2.5 s per direction).
    pub fn new(socket_path: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            io_timeout,
        }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }
}

#[async_trait]
impl ControlChannel for UnixChannel {
    async fn call(&self, request: Request) -> Result<Vec<u8>, ChannelError> {
        // Fresh connection per call; the stream is dropped (and the socket
        // closed) on every exit path below.
        let mut stream = match timeout(self.io_timeout, UnixStream::connect(&self.socket_path))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(_)) | Err(_) => return Err(ChannelError::Unreachable),
        };

        let message = request.encode();
        write_message(&mut stream, &message, self.io_timeout).await?;

        // Accumulate until the peer closes. A timeout or read error after at
        // least one byte ends accumulation rather than failing: the framing
        // is close-delimited, so whatever arrived is the whole response.
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match timeout(self.io_timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => raw.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => {
                    if raw.is_empty() {
                        return Err(ChannelError::Io(e));
                    }
                    break;
                }
                Err(_) => {
                    if raw.is_empty() {
                        return Err(ChannelError::Timeout);
                    }
                    break;
                }
            }
        }

        split_body(&raw).ok_or(ChannelError::Malformed)
    }
}

/// Write the full message in a single write call.
///
/// The control exchange is one small message on a local socket; a write
/// that the kernel accepts only partially is surfaced as
/// [`ChannelError::ShortWrite`] rather than retried.
async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    message: &[u8],
    io_timeout: Duration,
) -> Result<(), ChannelError> {
    let written = match timeout(io_timeout, stream.write(message)).await {
        Ok(result) => result?,
        Err(_) => return Err(ChannelError::Timeout),
    };
    if written != message.len() {
        return Err(ChannelError::ShortWrite {
            written,
            expected: message.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

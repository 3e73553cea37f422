//! The local control channel — one request/response exchange per call.
//!
//! The [`ControlChannel`] trait defines the contract between the
//! reconciliation engine and the transport. Each call opens a fresh
//! connection (or process), performs exactly one exchange, and returns the
//! response **body** bytes. The channel holds no state across calls and is
//! therefore freely shareable between tasks.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`UnixChannel`] | Normal operation; HTTP/1.0 over the provider's Unix socket |
//! | [`CliChannel`] | Degraded mode; spawns the provider binary and reads stdout |
//!
//! # Failure signalling
//!
//! Every failure mode is a [`ChannelError`] variant, but callers above the
//! channel boundary treat any of them as "no data this cycle" — the engine
//! never inspects which variant occurred.

pub mod cli;
pub mod unix;

use async_trait::async_trait;
use hivemesh_provider_api::Request;

pub use cli::CliChannel;
pub use unix::UnixChannel;

// ---------------------------------------------------------------------------
// ChannelError
// ---------------------------------------------------------------------------

/// Errors a single control-channel exchange can produce.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Could not connect to the provider endpoint.
    #[error("provider is unreachable")]
    Unreachable,

    /// The provider accepted the connection but never answered in time.
    #[error("timed out waiting for the provider")]
    Timeout,

    /// Fewer bytes than the full message were written. Partial writes are
    /// never silently retried.
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The connection failed mid-exchange.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The response could not be framed or the operation has no mapping on
    /// this transport.
    #[error("malformed response from provider")]
    Malformed,
}

// ---------------------------------------------------------------------------
// ControlChannel
// ---------------------------------------------------------------------------

/// One request/response exchange with the provider.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Perform the exchange and return the response body bytes.
    async fn call(&self, request: Request) -> Result<Vec<u8>, ChannelError>;
}

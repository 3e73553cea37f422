//! Client configuration, populated from environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for the control client.
///
/// All fields are populated from environment variables with defaults, so a
/// shell can start with zero configuration against a locally installed
/// provider.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `HIVEMESH_SOCKET` | (absent) | Explicit socket path; skips probing |
/// | `HIVEMESH_USER_SOCKET` | `~/Library/Application Support/network.Hivemesh.Hivemesh/run/hivemesh-provider.socket` | User-scoped socket |
/// | `HIVEMESH_SYSTEM_SOCKET` | `/var/run/hivemesh/hivemesh-provider.socket` | System-wide fallback |
/// | `HIVEMESH_POLL_INTERVAL_SECS` | `10` | Status poll cadence |
/// | `HIVEMESH_IO_TIMEOUT_MS` | `2500` | Per-direction socket timeout |
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Explicit socket path; when set, path probing is skipped entirely.
    pub socket_override: Option<PathBuf>,

    /// User-scoped socket of a provider running under the current account.
    pub user_socket: PathBuf,

    /// System-wide socket of a provider installed as a service.
    pub system_socket: PathBuf,

    /// Seconds between status polls while a consumer is subscribed.
    pub poll_interval_secs: u64,

    /// Socket connect/read/write timeout, per direction.
    pub io_timeout_ms: u64,
}

const USER_SOCKET_SUFFIX: &str =
    "Library/Application Support/network.Hivemesh.Hivemesh/run/hivemesh-provider.socket";
const SYSTEM_SOCKET: &str = "/var/run/hivemesh/hivemesh-provider.socket";

impl ControlConfig {
    /// Populate config from environment variables, applying defaults where
    /// absent.
    pub fn from_env() -> Self {
        let user_socket = std::env::var("HIVEMESH_USER_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/".into());
                Path::new(&home).join(USER_SOCKET_SUFFIX)
            });

        Self {
            socket_override: std::env::var("HIVEMESH_SOCKET").ok().map(PathBuf::from),
            user_socket,
            system_socket: std::env::var("HIVEMESH_SYSTEM_SOCKET")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(SYSTEM_SOCKET)),
            poll_interval_secs: std::env::var("HIVEMESH_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            io_timeout_ms: std::env::var("HIVEMESH_IO_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2500),
        }
    }

    /// Pick the socket path to use for the lifetime of the process.
    ///
    /// The explicit override wins; otherwise the user-scoped path is used if
    /// it exists, else the system path. Resolved once at startup — there is
    /// no per-call retry across the two locations.
    pub fn resolve_socket_path(&self) -> PathBuf {
        if let Some(ref path) = self.socket_override {
            return path.clone();
        }
        if self.user_socket.exists() {
            self.user_socket.clone()
        } else {
            self.system_socket.clone()
        }
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

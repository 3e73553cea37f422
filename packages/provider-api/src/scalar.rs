//! Scalar response decoding — access levels and the connection mode.
//!
//! `GET /nodes/{id}` and `GET /nodes/auto` answer with a bare scalar body:
//! older providers emit `true`/`false`, newer ones a non-negative integer
//! permission tier. Both collapse onto [`AccessLevel`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar body that could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("cannot decode scalar response {0:?}")]
pub struct DecodeError(pub String);

// ---------------------------------------------------------------------------
// AccessLevel
// ---------------------------------------------------------------------------

/// Permission tier of a hub connection.
///
/// `0` means disconnected / manual-disallowed; any value above zero means
/// connected at that tier. Boolean provider variants collapse to `{0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u32);

impl AccessLevel {
    pub const DISCONNECTED: AccessLevel = AccessLevel(0);
    pub const DEFAULT: AccessLevel = AccessLevel(1);

    /// Whether this level grants a connection at all.
    pub fn is_connected(&self) -> bool {
        self.0 > 0
    }

    /// Decode a scalar response body.
    ///
    /// Accepts `true`/`false` (any case, surrounding whitespace ignored) and
    /// bare non-negative integers. Anything else — including an empty body —
    /// is a [`DecodeError`].
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let text = String::from_utf8_lossy(body);
        let trimmed = text.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(AccessLevel(1)),
            "false" => Ok(AccessLevel(0)),
            other => other
                .parse::<u32>()
                .map(AccessLevel)
                .map_err(|_| DecodeError(trimmed.to_string())),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConnectionMode
// ---------------------------------------------------------------------------

/// Provider-wide connection policy, observed (not owned) by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Hubs are only connected by explicit operator action.
    Manual,
    /// Newly discovered hubs are auto-connected at the given default tier.
    Auto(AccessLevel),
}

impl ConnectionMode {
    /// Lift the scalar `/nodes/auto` answer into a mode.
    pub fn from_level(level: AccessLevel) -> Self {
        if level.is_connected() {
            ConnectionMode::Auto(level)
        } else {
            ConnectionMode::Manual
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, ConnectionMode::Auto(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

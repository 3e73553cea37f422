//! Active connection listing — `GET /connections/list/all`.

use serde::{Deserialize, Serialize};

/// One `[address, status]` pair from `/connections/list/all`.
///
/// The provider encodes each connection as a two-element JSON array rather
/// than an object; the serde attributes map that onto named fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ConnectionEntry {
    /// `host:port` of the remote hub.
    pub address: String,
    /// Provider-reported connection state (e.g. `"Connected"`).
    pub status: String,
}

impl From<(String, String)> for ConnectionEntry {
    fn from((address, status): (String, String)) -> Self {
        Self { address, status }
    }
}

impl From<ConnectionEntry> for (String, String) {
    fn from(entry: ConnectionEntry) -> Self {
        (entry.address, entry.status)
    }
}

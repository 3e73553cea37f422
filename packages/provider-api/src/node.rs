//! Node listing and registration payloads — `/lan/list`, `/nodes?saved`,
//! and the `PUT /nodes/{id}` body.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LanNode
// ---------------------------------------------------------------------------

/// One entry from `GET /lan/list` — a hub advertised on the local network.
///
/// The provider's mDNS resolver reports these with display-oriented field
/// names (`"Host name"`, `"Addresses"`) and stuffs everything else into a
/// free-text `"Description"` of newline-separated `key=value` pairs. The
/// node id — the only stable identifier a LAN entry has — is the value of
/// the first such pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanNode {
    /// Display name of the hub.
    #[serde(rename = "Host name")]
    pub name: String,

    /// `host:port` dial target; secondary key for connection-status lookups.
    #[serde(rename = "Addresses")]
    pub address: String,

    /// Free-text metadata, newline-separated `key=value` lines.
    #[serde(rename = "Description")]
    pub description: String,
}

impl LanNode {
    /// Extract the node id from the description field.
    ///
    /// The id is the value of the first `key=value` line. A first line with
    /// no `=` (or an empty value) means the entry has no usable id; such a
    /// node cannot be status-queried or deduplicated and callers must treat
    /// `None` as a first-class outcome, not guess a default.
    pub fn node_id(&self) -> Option<String> {
        let first_line = self.description.lines().next()?;
        match first_line.split('=').nth(1) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SavedNode
// ---------------------------------------------------------------------------

/// One entry from `GET /nodes?saved` — a hub the operator registered.
///
/// Unlike [`LanNode`], a saved entry always carries its `node_id` as a
/// proper field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedNode {
    pub host_name: String,
    pub address: String,
    pub node_id: String,
}

// ---------------------------------------------------------------------------
// NodeEntry
// ---------------------------------------------------------------------------

/// Request body for `PUT /nodes/{id}` and `PUT /nodes/auto`.
///
/// Serialises with the provider's camelCase keys (`hostName`, `accessLevel`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    pub address: String,
    pub host_name: String,
    pub access_level: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Wire contract for the Hivemesh provider control API.
//!
//! The provider daemon exposes a minimal control API over a local Unix
//! domain socket. It has no HTTP library on its side, so the contract is the
//! smallest workable subset of HTTP/1.0: one request per connection, a
//! request line plus at most two headers, and a close-delimited response.
//! This crate encodes that contract as Rust types — the payloads in
//! resource modules, the framing in [`wire`]. It performs no I/O.
//!
//! # Endpoints covered
//!
//! | Method | Path | Types |
//! |--------|------|-------|
//! | GET | `/status?timeout=N` | → [`StatusResponse`] |
//! | GET | `/nodes/auto` | → scalar [`AccessLevel`] |
//! | PUT/DELETE | `/nodes/auto` | `{}` or `{"accessLevel":N}` |
//! | GET | `/lan/list` | → `Vec<`[`LanNode`]`>` |
//! | GET | `/nodes?saved` | → `Vec<`[`SavedNode`]`>` |
//! | GET | `/nodes/{id}` | → scalar [`AccessLevel`] |
//! | PUT | `/nodes/{id}` | [`NodeEntry`] |
//! | DELETE | `/nodes/{id}` | — |
//! | POST | `/connections/connect\|disconnect?save=1` | JSON array of addresses |
//! | PUT | `/connections/mode/{auto\|manual}?save=1` | — |
//! | GET | `/connections/list/all` | → `Vec<`[`ConnectionEntry`]`>` |

pub mod connection;
pub mod node;
pub mod scalar;
pub mod status;
pub mod wire;

pub use connection::ConnectionEntry;
pub use node::{LanNode, NodeEntry, SavedNode};
pub use scalar::{AccessLevel, ConnectionMode, DecodeError};
pub use status::StatusResponse;
pub use wire::{split_body, Method, Request};

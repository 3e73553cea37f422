//! Control-plane client for the Hivemesh provider daemon.
//!
//! The provider is a background process that owns real connections to remote
//! hubs. This crate is everything a shell (menu-bar app, CLI, …) needs to
//! supervise it:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`channel`] | One-shot request/response transport to the provider ([`UnixChannel`], degraded [`CliChannel`]) |
//! | [`engine`] | Reconciliation passes producing an atomic [`Snapshot`], plus the two-call mutation sagas |
//! | [`hub`] | Remote-hub identity probe and the add-hub flow |
//! | [`monitor`] | Start/stop polling driver publishing [`ControlView`] updates |
//! | [`config`] | Environment-driven configuration and socket-path resolution |
//!
//! # Failure policy
//!
//! The channel reports a precise [`ChannelError`]; the engine deliberately
//! collapses every channel failure to [`EngineError::Unavailable`] and aborts
//! the whole reconciliation pass. No partial node set is ever published —
//! a consumer either gets a complete fresh snapshot or keeps the previous
//! one with a no-connection status.

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod hub;
pub mod monitor;

pub use channel::{ChannelError, CliChannel, ControlChannel, UnixChannel};
pub use config::ControlConfig;
pub use engine::{Engine, Node, NodeOrigin, ProviderStatus, Snapshot};
pub use error::EngineError;
pub use hub::{add_hub, probe_hub, AddHubError, HubIdentity, HubProbeError};
pub use monitor::{ControlView, Health, Monitor, MonitorHandle};

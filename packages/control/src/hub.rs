//! Remote hub identity probe and the add-hub flow.
//!
//! Registering a brand-new hub by address needs one exchange that is *not*
//! on the control channel: a plain HTTP GET to the remote hub itself at
//! `http://{address}/node_id/`, answering with exactly two
//! whitespace-separated tokens — the node id, then the host name. Anything
//! else is a hard input-validation failure, and **no** mutation calls are
//! issued against the provider.

use std::time::Duration;

use hivemesh_provider_api::AccessLevel;
use tracing::info;

use crate::engine::Engine;
use crate::error::EngineError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Identity reported by a hub's `/node_id/` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubIdentity {
    pub node_id: String,
    pub host_name: String,
}

/// Why a hub probe was rejected.
///
/// The variants map onto the two messages a shell shows the user:
/// "cannot connect to …" for transport problems, "bad answer from …" for a
/// response of the wrong shape.
#[derive(Debug, thiserror::Error)]
pub enum HubProbeError {
    #[error("invalid hub address {0:?} (expected host:port)")]
    InvalidAddress(String),

    #[error("cannot connect to {0}")]
    Unreachable(String),

    #[error("bad answer from http://{0}/node_id/")]
    BadAnswer(String),
}

/// Errors from the full add-hub flow.
#[derive(Debug, thiserror::Error)]
pub enum AddHubError {
    #[error(transparent)]
    Probe(#[from] HubProbeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Minimal `host:port` shape check — non-empty host, numeric port.
fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && !host.contains(char::is_whitespace)
                && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Ask a remote hub for its identity.
///
/// `GET http://{address}/node_id/` must answer 200 with a plain-text body of
/// exactly two whitespace-separated tokens: `node_id host_name`.
pub async fn probe_hub(
    client: &reqwest::Client,
    address: &str,
) -> Result<HubIdentity, HubProbeError> {
    if !is_host_port(address) {
        return Err(HubProbeError::InvalidAddress(address.to_string()));
    }

    let url = format!("http://{address}/node_id/");
    let response = client
        .get(&url)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
        .map_err(|_| HubProbeError::Unreachable(address.to_string()))?;

    if !response.status().is_success() {
        return Err(HubProbeError::BadAnswer(address.to_string()));
    }
    let text = response
        .text()
        .await
        .map_err(|_| HubProbeError::BadAnswer(address.to_string()))?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [node_id, host_name] => Ok(HubIdentity {
            node_id: node_id.to_string(),
            host_name: host_name.to_string(),
        }),
        _ => Err(HubProbeError::BadAnswer(address.to_string())),
    }
}

/// Probe a hub and register-and-connect it through the provider.
///
/// The probe runs first; on any probe failure the provider is left
/// untouched. On success the standard two-call connect saga is issued with
/// the probed identity and the user-supplied address.
pub async fn add_hub(
    engine: &Engine,
    client: &reqwest::Client,
    address: &str,
    level: AccessLevel,
) -> Result<HubIdentity, AddHubError> {
    let identity = probe_hub(client, address).await?;
    info!(
        "hub: {address} identified as {} ({})",
        identity.node_id, identity.host_name
    );
    engine
        .set_node_access(&identity.node_id, &identity.host_name, address, level)
        .await?;
    Ok(identity)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

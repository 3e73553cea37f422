//! Provider health — `GET /status?timeout=N`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The environment key whose value reflects direct-host readiness.
pub const HOST_DIRECT: &str = "hostDirect";

/// The value of [`HOST_DIRECT`] that means the provider is fully up.
pub const READY: &str = "Ready";

/// Response body of `GET /status?timeout=N`.
///
/// The provider reports one state string per execution environment; the
/// shell only ever looks at `envs["hostDirect"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub envs: HashMap<String, String>,
}

impl StatusResponse {
    /// The `hostDirect` environment state, if reported.
    pub fn host_direct(&self) -> Option<&str> {
        self.envs.get(HOST_DIRECT).map(String::as_str)
    }

    /// `true` when the `hostDirect` environment reports [`READY`].
    pub fn is_ready(&self) -> bool {
        self.host_direct() == Some(READY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_status_decodes() {
        let json = r#"{"envs":{"hostDirect":"Ready"}}"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.is_ready());
        assert_eq!(status.host_direct(), Some("Ready"));
    }

    #[test]
    fn non_ready_state_is_preserved() {
        let json = r#"{"envs":{"hostDirect":"Starting"}}"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert!(!status.is_ready());
        assert_eq!(status.host_direct(), Some("Starting"));
    }

    #[test]
    fn missing_host_direct_is_none() {
        let json = r#"{"envs":{}}"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(status.host_direct(), None);
        assert!(!status.is_ready());
    }
}

//! Degraded transport: drive the provider binary directly.
//!
//! The oldest shell variant predates the control socket; it spawns the
//! provider executable with the logical operation encoded as command-line
//! arguments and treats captured stdout as the response body. There is no
//! HTTP exchange here at all — [`CliChannel`] satisfies the same *logical*
//! contract (discover / get / set) by translating each known
//! method-and-path pair into argv.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use hivemesh_provider_api::{Method, Request};
use tokio::process::Command;
use tokio::time::timeout;

use super::{ChannelError, ControlChannel};

/// Subprocess-based transport.
#[derive(Debug, Clone)]
pub struct CliChannel {
    program: PathBuf,
    exec_timeout: Duration,
}

impl CliChannel {
    pub fn new(program: impl Into<PathBuf>, exec_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            exec_timeout,
        }
    }

    /// Translate a control request into provider-CLI argv.
    ///
    /// Returns `None` for operations the CLI surface does not expose; the
    /// caller reports those as [`ChannelError::Malformed`].
    fn argv_for(request: &Request) -> Option<Vec<String>> {
        let (path, _query) = match request.path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (request.path.as_str(), None),
        };
        let saved = request.path.contains("saved");

        let args: Vec<&str> = match (request.method, path) {
            (Method::Get, "/status") => vec!["status"],
            (Method::Get, "/lan/list") => vec!["lan", "list"],
            (Method::Get, "/nodes") if saved => vec!["nodes", "list", "--saved"],
            (Method::Get, "/nodes/auto") => vec!["nodes", "auto"],
            (Method::Put, "/nodes/auto") => vec!["nodes", "auto", "on"],
            (Method::Delete, "/nodes/auto") => vec!["nodes", "auto", "off"],
            (Method::Get, "/connections/list/all") => vec!["connections", "list", "all"],
            (Method::Put, "/connections/mode/auto") => vec!["connections", "mode", "auto"],
            (Method::Put, "/connections/mode/manual") => vec!["connections", "mode", "manual"],
            (Method::Post, "/connections/connect") | (Method::Post, "/connections/disconnect") => {
                let action = if path.ends_with("/connect") {
                    "connect"
                } else {
                    "disconnect"
                };
                // The HTTP body is a JSON array of addresses; the CLI takes
                // them as positional arguments.
                let addresses: Vec<String> =
                    serde_json::from_str(request.body.as_deref().unwrap_or("[]")).ok()?;
                let mut argv = vec!["connections".to_string(), action.to_string()];
                argv.extend(addresses);
                return Some(argv);
            }
            (method, path) => {
                let id = path.strip_prefix("/nodes/")?;
                return match method {
                    Method::Get => Some(vec!["nodes".into(), "status".into(), id.into()]),
                    Method::Delete => Some(vec!["nodes".into(), "remove".into(), id.into()]),
                    Method::Put => Some(vec![
                        "nodes".into(),
                        "add".into(),
                        id.into(),
                        request.body.clone().unwrap_or_default(),
                    ]),
                    Method::Post => None,
                };
            }
        };
        Some(args.into_iter().map(String::from).collect())
    }
}

#[async_trait]
impl ControlChannel for CliChannel {
    async fn call(&self, request: Request) -> Result<Vec<u8>, ChannelError> {
        let argv = Self::argv_for(&request).ok_or(ChannelError::Malformed)?;

        let output = match timeout(
            self.exec_timeout,
            Command::new(&self.program).args(&argv).output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(_)) => return Err(ChannelError::Unreachable),
            Err(_) => return Err(ChannelError::Timeout),
        };

        if !output.status.success() {
            return Err(ChannelError::Malformed);
        }
        Ok(output.stdout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

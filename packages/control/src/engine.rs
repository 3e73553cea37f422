//! Node reconciliation engine.
//!
//! Merges the provider's partially-overlapping node listings into one
//! consistent view and drives the state-changing calls. One
//! [`Engine::refresh`] call is one **reconciliation pass**:
//!
//! 1. `GET /nodes/auto` — the global connection mode.
//! 2. `GET /lan/list` — LAN-advertised hubs.
//! 3. `GET /nodes/{id}` per discovered hub — current access level.
//! 4. `GET /nodes?saved` — operator-registered hubs.
//! 5. Merge: LAN entries first (discovery order), then saved-only entries
//!    (saved order), at most one entry per node id, LAN wins on overlap.
//! 6. The finished [`Snapshot`] is returned as a value — consumers never
//!    observe a half-built set.
//!
//! Any failure in any step aborts the whole pass. Row order is a visible
//! contract: for unchanged underlying sets, consecutive passes produce the
//! same order.
//!
//! # Mutations
//!
//! The provider treats "known node" and "active connection" as separate
//! resources; this engine is the only place enforcing that they move
//! together. Every toggle is a two-call saga issued in a fixed order with no
//! rollback — a failed second call leaves an observable registered-but-
//! disconnected pair until the next pass picks it up.

use std::collections::HashSet;
use std::sync::Arc;

use hivemesh_provider_api::{
    AccessLevel, ConnectionEntry, ConnectionMode, LanNode, Method, NodeEntry, Request, SavedNode,
    StatusResponse,
};
use tracing::warn;

use crate::channel::ControlChannel;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Where a reconciled node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// Discovered on the local network this pass.
    Lan,
    /// Known only from the provider's saved registry.
    Saved,
}

/// One reconciled hub entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Primary key; always present (unidentifiable entries are dropped
    /// before they reach a snapshot).
    pub id: String,
    pub name: String,
    /// `host:port` dial target.
    pub address: String,
    pub access: AccessLevel,
    pub origin: NodeOrigin,
}

/// The complete result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub auto_mode: ConnectionMode,
    pub nodes: Vec<Node>,
}

/// Provider health as reported by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Ready,
    /// Up but not serving; carries the provider's own state string.
    Degraded(String),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives the control channel in a request/response cycle.
///
/// Holds only an `Arc` to the channel; cheap to clone and share. All calls
/// within one pass run sequentially — the channel is never held open and no
/// two calls are in flight at once.
#[derive(Clone)]
pub struct Engine {
    channel: Arc<dyn ControlChannel>,
}

impl Engine {
    pub fn new(channel: Arc<dyn ControlChannel>) -> Self {
        Self { channel }
    }

    /// One channel call, with the error collapsed to "no data".
    async fn fetch(&self, request: Request) -> Result<Vec<u8>, EngineError> {
        let label = format!("{} {}", request.method, request.path);
        match self.channel.call(request).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!("engine: {label} failed: {e}");
                Err(EngineError::Unavailable)
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, EngineError> {
        serde_json::from_slice(body).map_err(|e| EngineError::Decode(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Provider health, from `GET /status?timeout=5`.
    pub async fn status(&self) -> Result<ProviderStatus, EngineError> {
        let body = self.fetch(Request::new(Method::Get, "/status?timeout=5")).await?;
        let status: StatusResponse = Self::decode(&body)?;
        // A missing hostDirect entry is reported the way the shell has
        // always shown it: as an "Error" state, not a decode failure.
        let state = status.host_direct().unwrap_or("Error");
        if state == hivemesh_provider_api::status::READY {
            Ok(ProviderStatus::Ready)
        } else {
            Ok(ProviderStatus::Degraded(state.to_string()))
        }
    }

    /// Raw connection listing, from `GET /connections/list/all`.
    pub async fn connections(&self) -> Result<Vec<ConnectionEntry>, EngineError> {
        let body = self
            .fetch(Request::new(Method::Get, "/connections/list/all"))
            .await?;
        Self::decode(&body)
    }

    /// Current access level of one node.
    async fn node_access(&self, node_id: &str) -> Result<AccessLevel, EngineError> {
        let body = self
            .fetch(Request::new(Method::Get, format!("/nodes/{node_id}")))
            .await?;
        AccessLevel::parse(&body).map_err(|e| EngineError::Decode(e.to_string()))
    }

    /// Run one full reconciliation pass.
    pub async fn refresh(&self) -> Result<Snapshot, EngineError> {
        let body = self.fetch(Request::new(Method::Get, "/nodes/auto")).await?;
        let auto_level =
            AccessLevel::parse(&body).map_err(|e| EngineError::Decode(e.to_string()))?;
        let auto_mode = ConnectionMode::from_level(auto_level);

        let body = self.fetch(Request::new(Method::Get, "/lan/list")).await?;
        let lan: Vec<LanNode> = Self::decode(&body)?;

        let mut nodes = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for entry in &lan {
            let Some(id) = entry.node_id() else {
                // No usable id: cannot be status-queried or deduplicated.
                // Dropped from the visible set rather than guessed at.
                warn!(
                    "engine: dropping LAN node {:?} ({}) with no usable node id",
                    entry.name, entry.address
                );
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            let access = self.node_access(&id).await?;
            nodes.push(Node {
                id,
                name: entry.name.clone(),
                address: entry.address.clone(),
                access,
                origin: NodeOrigin::Lan,
            });
        }

        let body = self.fetch(Request::new(Method::Get, "/nodes?saved")).await?;
        let saved: Vec<SavedNode> = Self::decode(&body)?;

        for entry in saved {
            if seen.contains(&entry.node_id) {
                continue;
            }
            let access = self.node_access(&entry.node_id).await?;
            seen.insert(entry.node_id.clone());
            nodes.push(Node {
                id: entry.node_id,
                name: entry.host_name,
                address: entry.address,
                access,
                origin: NodeOrigin::Saved,
            });
        }

        Ok(Snapshot { auto_mode, nodes })
    }

    // -----------------------------------------------------------------------
    // Mutations (two-call sagas)
    // -----------------------------------------------------------------------

    /// Set a node's desired access level.
    ///
    /// Always issues both calls, in this order, regardless of the first
    /// call's outcome:
    ///
    /// 1. `PUT /nodes/{id}` (level > 0) or `DELETE /nodes/{id}` (level 0);
    /// 2. `POST /connections/connect?save=1` or
    ///    `POST /connections/disconnect?save=1` with the node's address.
    ///
    /// The first failure (if any) is reported after the second call has been
    /// attempted.
    pub async fn set_node_access(
        &self,
        node_id: &str,
        name: &str,
        address: &str,
        level: AccessLevel,
    ) -> Result<(), EngineError> {
        let register = if level.is_connected() {
            Request::json(
                Method::Put,
                format!("/nodes/{node_id}"),
                &NodeEntry {
                    address: address.to_string(),
                    host_name: name.to_string(),
                    access_level: level.0,
                },
            )
            .map_err(|e| EngineError::Decode(e.to_string()))?
        } else {
            Request::new(Method::Delete, format!("/nodes/{node_id}"))
        };
        let first = self.channel.call(register).await;

        let action = if level.is_connected() {
            "connect"
        } else {
            "disconnect"
        };
        let body = serde_json::to_string(&[address])
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        let second = self
            .channel
            .call(Request::with_body(
                Method::Post,
                format!("/connections/{action}?save=1"),
                body,
            ))
            .await;

        if let Err(e) = &first {
            warn!("engine: node registration for {node_id} failed: {e}");
        }
        if let Err(e) = &second {
            warn!("engine: connection {action} for {address} failed: {e}");
        }
        first?;
        second?;
        Ok(())
    }

    /// Toggle the provider-wide auto-connect mode.
    ///
    /// Same two-call shape as [`set_node_access`], against `/nodes/auto` and
    /// `/connections/mode/{auto|manual}?save=1`.
    pub async fn set_auto_mode(
        &self,
        enabled: bool,
        default_level: Option<AccessLevel>,
    ) -> Result<(), EngineError> {
        let first = if enabled {
            let body = match default_level {
                Some(level) => format!(r#"{{"accessLevel":{}}}"#, level.0),
                None => "{}".to_string(),
            };
            self.channel
                .call(Request::with_body(Method::Put, "/nodes/auto", body))
                .await
        } else {
            self.channel
                .call(Request::with_body(Method::Delete, "/nodes/auto", "{}"))
                .await
        };

        let mode = if enabled { "auto" } else { "manual" };
        let second = self
            .channel
            .call(Request::new(
                Method::Put,
                format!("/connections/mode/{mode}?save=1"),
            ))
            .await;

        if let Err(e) = &first {
            warn!("engine: auto-mode registration failed: {e}");
        }
        if let Err(e) = &second {
            warn!("engine: connection mode change to {mode} failed: {e}");
        }
        first?;
        second?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::channel::ChannelError;

    /// Scripted channel: maps `"<METHOD> <path>"` to a canned body and logs
    /// every call (with its body) in order.
    struct MockChannel {
        responses: HashMap<String, Vec<u8>>,
        unreachable: HashSet<String>,
        log: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MockChannel {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                unreachable: HashSet::new(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, key: &str, body: &str) -> Self {
            self.responses.insert(key.to_string(), body.as_bytes().to_vec());
            self
        }

        fn fail(mut self, key: &str) -> Self {
            self.unreachable.insert(key.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }

        fn bodies(&self) -> Vec<Option<String>> {
            self.log.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
        }
    }

    #[async_trait]
    impl ControlChannel for MockChannel {
        async fn call(&self, request: Request) -> Result<Vec<u8>, ChannelError> {
            let key = format!("{} {}", request.method, request.path);
            self.log
                .lock()
                .unwrap()
                .push((key.clone(), request.body.clone()));
            if self.unreachable.contains(&key) {
                return Err(ChannelError::Unreachable);
            }
            self.responses
                .get(&key)
                .cloned()
                .ok_or(ChannelError::Unreachable)
        }
    }

    fn make_engine(channel: MockChannel) -> (Engine, Arc<MockChannel>) {
        let channel = Arc::new(channel);
        (Engine::new(Arc::clone(&channel) as Arc<dyn ControlChannel>), channel)
    }

    fn lan_entry(name: &str, address: &str, id: &str) -> String {
        format!(
            r#"{{"Host name":"{name}","Addresses":"{address}","Description":"node_id={id}"}}"#
        )
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn merge_dedups_by_id_and_prefers_lan_entries() {
        let lan = format!(
            "[{},{}]",
            lan_entry("lan-a", "10.0.0.5:61000", "aaa"),
            lan_entry("lan-b", "10.0.0.6:61000", "bbb")
        );
        // "aaa" also appears as a saved node with a stale address; "ccc" is
        // saved-only and must be appended after the LAN block.
        let saved = r#"[
            {"host_name":"old-a","address":"10.9.9.9:61000","node_id":"aaa"},
            {"host_name":"saved-c","address":"10.0.0.7:61000","node_id":"ccc"}
        ]"#;

        let (engine, _) = make_engine(
            MockChannel::new()
                .respond("GET /nodes/auto", "false")
                .respond("GET /lan/list", &lan)
                .respond("GET /nodes/aaa", "true")
                .respond("GET /nodes/bbb", "false")
                .respond("GET /nodes/ccc", "2")
                .respond("GET /nodes?saved", saved),
        );

        let snapshot = engine.refresh().await.unwrap();
        assert_eq!(snapshot.auto_mode, ConnectionMode::Manual);

        let ids: Vec<&str> = snapshot.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["aaa", "bbb", "ccc"], "LAN first, saved-only appended");

        // The LAN-sourced entry wins for overlapping ids.
        assert_eq!(snapshot.nodes[0].name, "lan-a");
        assert_eq!(snapshot.nodes[0].address, "10.0.0.5:61000");
        assert_eq!(snapshot.nodes[0].access, AccessLevel(1));
        assert_eq!(snapshot.nodes[0].origin, NodeOrigin::Lan);

        assert_eq!(snapshot.nodes[2].origin, NodeOrigin::Saved);
        assert_eq!(snapshot.nodes[2].access, AccessLevel(2));
    }

    #[tokio::test]
    async fn unidentifiable_lan_nodes_are_dropped_not_queried() {
        let lan = format!(
            r#"[{{"Host name":"ghost","Addresses":"10.0.0.9:61000","Description":"no equals here"}},{}]"#,
            lan_entry("lan-a", "10.0.0.5:61000", "aaa")
        );
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("GET /nodes/auto", "false")
                .respond("GET /lan/list", &lan)
                .respond("GET /nodes/aaa", "true")
                .respond("GET /nodes?saved", "[]"),
        );

        let snapshot = engine.refresh().await.unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].id, "aaa");

        // The ghost must never have produced a status query (in particular
        // not one with an empty id).
        let calls = channel.calls();
        assert!(!calls.iter().any(|c| c == "GET /nodes/"));
        assert_eq!(calls.iter().filter(|c| c.starts_with("GET /nodes/")).count(), 2); // auto + aaa
    }

    #[tokio::test]
    async fn status_query_uses_exact_id_and_decodes_true_as_level_one() {
        let lan = format!("[{}]", lan_entry("hub", "10.0.0.5:61000", "abc123"));
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("GET /nodes/auto", "false")
                .respond("GET /lan/list", &lan)
                .respond("GET /nodes/abc123", "true")
                .respond("GET /nodes?saved", "[]"),
        );

        let snapshot = engine.refresh().await.unwrap();
        assert_eq!(snapshot.nodes[0].access, AccessLevel(1));
        assert!(channel.calls().contains(&"GET /nodes/abc123".to_string()));
    }

    #[tokio::test]
    async fn unreachable_discovery_aborts_the_whole_pass() {
        let (engine, _) = make_engine(
            MockChannel::new()
                .respond("GET /nodes/auto", "false")
                .fail("GET /lan/list"),
        );
        assert!(matches!(
            engine.refresh().await,
            Err(EngineError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn per_node_status_failure_aborts_the_whole_pass() {
        let lan = format!("[{}]", lan_entry("hub", "10.0.0.5:61000", "aaa"));
        let (engine, _) = make_engine(
            MockChannel::new()
                .respond("GET /nodes/auto", "false")
                .respond("GET /lan/list", &lan)
                .fail("GET /nodes/aaa"),
        );
        assert!(matches!(
            engine.refresh().await,
            Err(EngineError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn auto_mode_failure_aborts_before_any_discovery() {
        let (engine, channel) = make_engine(MockChannel::new().fail("GET /nodes/auto"));
        assert!(engine.refresh().await.is_err());
        assert_eq!(channel.calls(), ["GET /nodes/auto"]);
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ready_and_degraded_status() {
        let (engine, _) = make_engine(
            MockChannel::new().respond("GET /status?timeout=5", r#"{"envs":{"hostDirect":"Ready"}}"#),
        );
        assert_eq!(engine.status().await.unwrap(), ProviderStatus::Ready);

        let (engine, _) = make_engine(
            MockChannel::new()
                .respond("GET /status?timeout=5", r#"{"envs":{"hostDirect":"Starting"}}"#),
        );
        assert_eq!(
            engine.status().await.unwrap(),
            ProviderStatus::Degraded("Starting".into())
        );

        let (engine, _) = make_engine(
            MockChannel::new().respond("GET /status?timeout=5", r#"{"envs":{}}"#),
        );
        assert_eq!(
            engine.status().await.unwrap(),
            ProviderStatus::Degraded("Error".into())
        );
    }

    #[tokio::test]
    async fn connections_listing_decodes_pairs() {
        let (engine, _) = make_engine(MockChannel::new().respond(
            "GET /connections/list/all",
            r#"[["10.0.0.5:61000","Connected"]]"#,
        ));
        let entries = engine.connections().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, "10.0.0.5:61000");
    }

    // -----------------------------------------------------------------------
    // Mutation sagas
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn connecting_issues_put_then_connect_in_order() {
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("PUT /nodes/abc123", "")
                .respond("POST /connections/connect?save=1", ""),
        );

        engine
            .set_node_access("abc123", "hub-1", "10.0.0.5:61000", AccessLevel(1))
            .await
            .unwrap();

        assert_eq!(
            channel.calls(),
            ["PUT /nodes/abc123", "POST /connections/connect?save=1"]
        );
        let bodies = channel.bodies();
        assert_eq!(
            bodies[0].as_deref(),
            Some(r#"{"address":"10.0.0.5:61000","hostName":"hub-1","accessLevel":1}"#)
        );
        assert_eq!(bodies[1].as_deref(), Some(r#"["10.0.0.5:61000"]"#));
    }

    #[tokio::test]
    async fn disconnecting_issues_delete_then_disconnect_in_order() {
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("DELETE /nodes/abc123", "")
                .respond("POST /connections/disconnect?save=1", ""),
        );

        engine
            .set_node_access("abc123", "hub-1", "10.0.0.5:61000", AccessLevel(0))
            .await
            .unwrap();

        assert_eq!(
            channel.calls(),
            ["DELETE /nodes/abc123", "POST /connections/disconnect?save=1"]
        );
    }

    #[tokio::test]
    async fn second_saga_call_is_issued_even_when_first_fails() {
        let (engine, channel) = make_engine(
            MockChannel::new()
                .fail("PUT /nodes/abc123")
                .respond("POST /connections/connect?save=1", ""),
        );

        let result = engine
            .set_node_access("abc123", "hub-1", "10.0.0.5:61000", AccessLevel(1))
            .await;

        assert!(matches!(result, Err(EngineError::Unavailable)));
        assert_eq!(
            channel.calls(),
            ["PUT /nodes/abc123", "POST /connections/connect?save=1"],
            "both calls must always be attempted"
        );
    }

    #[tokio::test]
    async fn auto_mode_toggle_follows_the_same_shape() {
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("PUT /nodes/auto", "")
                .respond("PUT /connections/mode/auto?save=1", ""),
        );
        engine.set_auto_mode(true, None).await.unwrap();
        assert_eq!(
            channel.calls(),
            ["PUT /nodes/auto", "PUT /connections/mode/auto?save=1"]
        );
        assert_eq!(channel.bodies()[0].as_deref(), Some("{}"));

        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("DELETE /nodes/auto", "")
                .respond("PUT /connections/mode/manual?save=1", ""),
        );
        engine.set_auto_mode(false, None).await.unwrap();
        assert_eq!(
            channel.calls(),
            ["DELETE /nodes/auto", "PUT /connections/mode/manual?save=1"]
        );
    }

    #[tokio::test]
    async fn auto_mode_with_default_level_carries_it_in_the_body() {
        let (engine, channel) = make_engine(
            MockChannel::new()
                .respond("PUT /nodes/auto", "")
                .respond("PUT /connections/mode/auto?save=1", ""),
        );
        engine
            .set_auto_mode(true, Some(AccessLevel(3)))
            .await
            .unwrap();
        assert_eq!(channel.bodies()[0].as_deref(), Some(r#"{"accessLevel":3}"#));
    }
}

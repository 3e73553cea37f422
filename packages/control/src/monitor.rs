//! Polling driver — drives the engine only while a consumer is subscribed.
//!
//! The shell starts a [`Monitor`] when its view becomes visible and stops it
//! when the view goes away; there is no hidden visibility flag, just an
//! explicit start/stop handle. While running, the loop:
//!
//! - polls `GET /status` once per tick (cheap);
//! - runs a **full** reconciliation at startup, on an observed transition
//!   from unreachable/degraded to ready, and on an explicit
//!   [`MonitorHandle::refresh`];
//! - publishes every resulting [`ControlView`] through a `watch` channel.
//!
//! The loop is strictly sequential: a new cycle never starts while a prior
//! one is in flight, and mutations triggered elsewhere simply request a
//! refresh rather than racing the loop. A failed reconciliation keeps the
//! previous snapshot and flips the health to [`Health::NoConnection`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::{Engine, ProviderStatus, Snapshot};

// ---------------------------------------------------------------------------
// Published view
// ---------------------------------------------------------------------------

/// Provider health from the consumer's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    /// The control channel produced no data this cycle.
    NoConnection,
    /// The provider answered but is not serving (carries its state string).
    Degraded(String),
    /// Fully up.
    Ready,
}

/// What the presentation layer renders: health plus the latest complete
/// snapshot (if any pass has ever succeeded).
#[derive(Debug, Clone, PartialEq)]
pub struct ControlView {
    pub health: Health,
    pub snapshot: Option<Snapshot>,
}

impl ControlView {
    fn empty() -> Self {
        Self {
            health: Health::NoConnection,
            snapshot: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

enum Command {
    Refresh,
}

/// Factory for the polling loop.
pub struct Monitor;

impl Monitor {
    /// Spawn the polling loop. Dropping (or [`stop`](MonitorHandle::stop)ping)
    /// the returned handle ends it.
    pub fn start(engine: Arc<Engine>, interval: Duration) -> MonitorHandle {
        let (view_tx, view_rx) = watch::channel(ControlView::empty());
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_loop(engine, interval, view_tx, cmd_rx));
        MonitorHandle {
            view_rx,
            cmd_tx,
            task,
        }
    }
}

/// Live handle to a running monitor loop.
pub struct MonitorHandle {
    view_rx: watch::Receiver<ControlView>,
    cmd_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// A receiver of published views; `borrow()` gives the latest one.
    pub fn subscribe(&self) -> watch::Receiver<ControlView> {
        self.view_rx.clone()
    }

    /// Request an immediate full reconciliation (user-triggered refresh or
    /// post-mutation re-read). Best-effort: ignored if the loop is gone.
    pub async fn refresh(&self) {
        let _ = self.cmd_tx.send(Command::Refresh).await;
    }

    /// Stop the loop.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn run_loop(
    engine: Arc<Engine>,
    interval: Duration,
    view_tx: watch::Sender<ControlView>,
    mut commands: mpsc::Receiver<Command>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Startup cycle always attempts a full reconciliation.
    let mut view = cycle(&engine, &ControlView::empty(), true).await;
    let _ = view_tx.send(view.clone());

    loop {
        let forced = tokio::select! {
            _ = ticker.tick() => false,
            command = commands.recv() => match command {
                Some(Command::Refresh) => true,
                None => break,
            },
        };
        view = cycle(&engine, &view, forced).await;
        let _ = view_tx.send(view.clone());
    }
}

/// One polling cycle: status probe, and a full pass when warranted.
async fn cycle(engine: &Engine, previous: &ControlView, forced: bool) -> ControlView {
    let mut health = match engine.status().await {
        Ok(ProviderStatus::Ready) => Health::Ready,
        Ok(ProviderStatus::Degraded(state)) => Health::Degraded(state),
        Err(e) => {
            warn!("monitor: status poll failed: {e}");
            Health::NoConnection
        }
    };

    let became_ready = health == Health::Ready && previous.health != Health::Ready;
    let want_full = forced || became_ready;

    let snapshot = if want_full && health == Health::Ready {
        if became_ready {
            info!("monitor: provider became ready; reconciling");
        }
        match engine.refresh().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                // A failed pass produced no data this cycle: keep the old
                // snapshot, but drop health to no-connection so the next
                // Ready poll is a transition again and the pass is retried.
                warn!("monitor: reconciliation failed: {e}");
                health = Health::NoConnection;
                previous.snapshot.clone()
            }
        }
    } else {
        previous.snapshot.clone()
    };

    ControlView { health, snapshot }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

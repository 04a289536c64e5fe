//! Engine progress events.
//!
//! The executor reports coarse progress over an mpsc channel. Emission is
//! skipped entirely when no listener is attached, so the hot path pays a
//! single atomic load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::run_context::{NodeStatus, RunStatus};

/// Events emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RunStarted {
        run_id: String,
    },
    NodeStarted {
        node_id: String,
    },
    NodeFinished {
        node_id: String,
        status: NodeStatus,
    },
    /// One full pass over a cycle group's members completed.
    CyclePass {
        group: String,
        pass: u32,
    },
    RunFinished {
        run_id: String,
        status: RunStatus,
    },
}

/// Sender wrapper for engine events, with an atomic active flag so that
/// emission can be cheaply skipped when no listener is attached.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<EngineEvent>,
    active: Arc<AtomicBool>,
}

impl EventEmitter {
    /// Create an emitter that forwards to `tx`.
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            tx,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create an emitter that drops every event.
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self {
            tx,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Send an event; a full or closed channel is not an error.
    pub async fn emit(&self, event: EngineEvent) {
        if self.is_active() {
            let _ = self.tx.send(event).await;
        }
    }
}

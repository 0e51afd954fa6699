use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted over the course of one graph execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        node: NodeId,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        node: NodeId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeSkipped {
        run_id: RunId,
        node: NodeId,
        timestamp: DateTime<Utc>,
    },
    NodeCancelled {
        run_id: RunId,
        node: NodeId,
        timestamp: DateTime<Utc>,
    },
    NodeMessage {
        run_id: RunId,
        node: NodeId,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Handle a step uses to surface progress without touching state
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    node: NodeId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, node: NodeId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            run_id,
            node,
            sender,
        }
    }

    /// Emit a progress message for this node.
    pub fn info(&self, message: impl Into<String>) {
        let _ = self.sender.send(ExecutionEvent::NodeMessage {
            run_id: self.run_id,
            node: self.node.clone(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}

/// In-process broadcast bus for execution events
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn emitter(&self, run_id: RunId, node: NodeId) -> EventEmitter {
        EventEmitter::new(run_id, node, self.sender.clone())
    }
}

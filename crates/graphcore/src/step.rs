use crate::{EventEmitter, NodeId, PartialUpdate, StateSnapshot, StepError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Contract for one unit of work in the graph.
///
/// A step reads from the snapshot it is handed and returns the fields
/// it owns as a partial update. Steps must not keep hidden shared
/// mutable state beyond what they read from the snapshot; any external
/// client handle (search, model) is injected at construction so that
/// concurrent invocation is safe and test doubles plug in at the same
/// seam.
#[async_trait]
pub trait Step: Send + Sync {
    /// Registry identifier (e.g. "search.google", "analyze.reddit").
    fn name(&self) -> &str;

    /// Runs the step against a stable view of the state.
    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError>;
}

/// Per-invocation context handed to a step.
#[derive(Clone)]
pub struct StepContext {
    /// Name of the node this invocation belongs to.
    pub node: NodeId,

    /// Read-only state view taken at dispatch time. Stable for the
    /// whole invocation even while sibling nodes merge concurrently.
    pub snapshot: StateSnapshot,

    /// Emitter for progress messages observable by the caller.
    pub events: EventEmitter,

    /// Cancelled when the run deadline expires or a fail-fast run
    /// aborts. Long-running steps should select against it.
    pub cancellation: CancellationToken,
}

impl StepContext {
    /// Fetches a required string field or fails the step.
    pub fn require_str(&self, field: &str) -> Result<&str, StepError> {
        self.snapshot
            .get_str(field)
            .ok_or_else(|| StepError::Failed(format!("missing required field '{}'", field)))
    }
}

use crate::plan::ExecutionPlan;
use crate::runner::run_step;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use graphcore::{
    EngineError, EventBus, ExecutionEvent, GraphDefinition, NodeId, PartialUpdate, RunId,
    StateSnapshot, StateStore, StepContext, StepError, END, START,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::{sleep_until, Instant as TokioInstant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Scheduling configuration for one executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Cap on simultaneously running nodes. `None` bounds fan-out only
    /// by how many nodes are eligible at once.
    pub max_parallel: Option<usize>,
    /// Run-level deadline. On expiry no new nodes are dispatched and
    /// still-running nodes are reported Cancelled; state merged so far
    /// is preserved in the outcome.
    pub deadline: Option<Duration>,
    /// When true, the first node failure cancels every sibling still
    /// in flight. The default lets independent branches finish.
    pub fail_fast: bool,
}

/// Lifecycle of one node within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Not all predecessors have completed.
    Pending,
    /// Dispatched to a runner.
    Running,
    /// Partial update merged.
    Done,
    /// The step reported or raised a fault.
    Failed,
    /// A predecessor failed or was skipped; never dispatched.
    Skipped,
    /// The run was cancelled while this node was in flight.
    Cancelled,
}

/// One recorded node fault.
#[derive(Debug, Clone)]
pub struct NodeFailure {
    pub node: NodeId,
    pub error: StepError,
}

/// Terminal record of one execution: the final state plus per-node
/// bookkeeping. A failed run still carries every merge that landed
/// before the failure.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub state: StateSnapshot,
    pub statuses: HashMap<NodeId, NodeStatus>,
    pub failures: Vec<NodeFailure>,
    pub success: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn skipped(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self
            .statuses
            .iter()
            .filter(|(_, s)| **s == NodeStatus::Skipped)
            .map(|(n, _)| n.as_str())
            .collect();
        nodes.sort_unstable();
        nodes
    }
}

type Completion = (NodeId, Result<PartialUpdate, StepError>, u64);

/// Drives one compiled plan over one state store.
///
/// Nodes move Pending -> Running -> Done/Failed; every currently
/// eligible node is dispatched concurrently, and each completion is
/// merged serially before downstream eligibility is re-evaluated. A
/// fan-in node is dispatched only once ALL of its predecessors have
/// merged, so its snapshot never reflects a partial barrier.
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub async fn run(
        &self,
        graph: &GraphDefinition,
        plan: &ExecutionPlan,
        store: StateStore,
        events: &EventBus,
    ) -> Result<RunOutcome, EngineError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let deadline = self.config.deadline.map(|d| TokioInstant::now() + d);

        events.emit(ExecutionEvent::RunStarted {
            run_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%run_id, "starting graph run");

        let mut statuses: HashMap<NodeId, NodeStatus> = plan
            .nodes()
            .iter()
            .map(|n| (n.clone(), NodeStatus::Pending))
            .collect();

        // Completed-predecessor counts; START counts as done from the
        // outset, which is what makes its successors eligible.
        let mut done_preds: HashMap<NodeId, usize> = plan
            .nodes()
            .iter()
            .cloned()
            .chain([END.to_string()])
            .map(|n| (n, 0))
            .collect();
        for succ in plan.successors(START) {
            *done_preds.get_mut(succ).expect("successor in plan") += 1;
        }

        let mut running: FuturesUnordered<BoxFuture<'static, Completion>> = FuturesUnordered::new();
        let mut failures: Vec<NodeFailure> = Vec::new();

        loop {
            if !cancel.is_cancelled() {
                for node in plan.nodes() {
                    if statuses[node] != NodeStatus::Pending {
                        continue;
                    }
                    if done_preds[node] < plan.predecessors(node).len() {
                        continue;
                    }
                    if let Some(cap) = self.config.max_parallel {
                        if running.len() >= cap {
                            break;
                        }
                    }

                    let step = graph.step(node).ok_or_else(|| {
                        EngineError::Execution(format!("node '{}' has no step", node))
                    })?;
                    statuses.insert(node.clone(), NodeStatus::Running);
                    events.emit(ExecutionEvent::NodeStarted {
                        run_id,
                        node: node.clone(),
                        timestamp: Utc::now(),
                    });

                    // Snapshot at dispatch time: every predecessor has
                    // merged by now, and later merges stay invisible.
                    let ctx = StepContext {
                        node: node.clone(),
                        snapshot: store.snapshot(),
                        events: events.emitter(run_id, node.clone()),
                        cancellation: cancel.clone(),
                    };
                    let node_id = node.clone();
                    let handle = tokio::spawn(async move {
                        let start = Instant::now();
                        let result = run_step(step, ctx).await;
                        (result, start.elapsed().as_millis() as u64)
                    });
                    running.push(Box::pin(async move {
                        match handle.await {
                            Ok((result, duration_ms)) => (node_id, result, duration_ms),
                            Err(e) if e.is_panic() => (
                                node_id,
                                Err(StepError::Failed(format!("step panicked: {}", e))),
                                0,
                            ),
                            Err(e) => (
                                node_id,
                                Err(StepError::Failed(format!("task failed: {}", e))),
                                0,
                            ),
                        }
                    }));
                }
            }

            if running.is_empty() {
                break;
            }

            let joined = match deadline {
                Some(dl) if !cancel.is_cancelled() => {
                    tokio::select! {
                        joined = running.next() => joined,
                        _ = sleep_until(dl) => {
                            tracing::warn!(%run_id, "run deadline expired, cancelling in-flight nodes");
                            cancel.cancel();
                            continue;
                        }
                    }
                }
                _ => running.next().await,
            };
            let Some((node, result, duration_ms)) = joined else {
                continue;
            };

            match result {
                Ok(update) => {
                    // Whole-update merges are serialized here; barrier
                    // counts only advance after the merge has landed.
                    store.merge(&node, update)?;
                    statuses.insert(node.clone(), NodeStatus::Done);
                    tracing::info!(%run_id, %node, duration_ms, "node completed");
                    events.emit(ExecutionEvent::NodeCompleted {
                        run_id,
                        node: node.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    for succ in plan.successors(&node) {
                        *done_preds.get_mut(succ).expect("successor in plan") += 1;
                    }
                }
                Err(StepError::Cancelled) => {
                    statuses.insert(node.clone(), NodeStatus::Cancelled);
                    events.emit(ExecutionEvent::NodeCancelled {
                        run_id,
                        node,
                        timestamp: Utc::now(),
                    });
                }
                Err(error) => {
                    tracing::error!(%run_id, %node, %error, "node failed");
                    statuses.insert(node.clone(), NodeStatus::Failed);
                    events.emit(ExecutionEvent::NodeFailed {
                        run_id,
                        node: node.clone(),
                        error: error.to_string(),
                        timestamp: Utc::now(),
                    });
                    failures.push(NodeFailure { node, error });
                    if self.config.fail_fast {
                        cancel.cancel();
                    }
                }
            }
        }

        // Whatever never became eligible is reported, not forgotten.
        for node in plan.nodes() {
            if statuses[node] == NodeStatus::Pending {
                statuses.insert(node.clone(), NodeStatus::Skipped);
                events.emit(ExecutionEvent::NodeSkipped {
                    run_id,
                    node: node.clone(),
                    timestamp: Utc::now(),
                });
            }
        }

        let success = done_preds[END] == plan.predecessors(END).len();
        let duration_ms = started.elapsed().as_millis() as u64;
        events.emit(ExecutionEvent::RunCompleted {
            run_id,
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
        tracing::info!(%run_id, success, duration_ms, "graph run finished");

        Ok(RunOutcome {
            run_id,
            state: store.into_snapshot(),
            statuses,
            failures,
            success,
            duration_ms,
        })
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

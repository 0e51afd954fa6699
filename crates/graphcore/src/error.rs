use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while building or compiling a graph. All of these are
/// fatal: no execution plan is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Duplicate node: '{0}' is already registered")]
    DuplicateNode(NodeId),

    #[error("Unknown node: '{0}' is not registered")]
    UnknownNode(NodeId),

    #[error("Unknown step: no step registered under '{0}'")]
    UnknownStep(String),

    #[error("Self loop on node '{0}'")]
    SelfLoop(NodeId),

    #[error("Invalid edge {from} -> {to}: edges may not enter START or leave END")]
    InvalidEdge { from: NodeId, to: NodeId },

    #[error("Cyclic dependency detected")]
    Cycle,

    #[error("Unreachable node '{node}': {reason}")]
    Unreachable { node: NodeId, reason: String },
}

/// Errors raised by the state store. An unknown field in a partial
/// update is a programming error in the graph author's schema, not a
/// recoverable run-time condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Unknown field '{field}' written by node '{node}'")]
    UnknownField { field: String, node: NodeId },
}

/// Errors produced by one step invocation. These are contained to the
/// node that raised them and aggregated into the run outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Step failed: {0}")]
    Failed(String),

    #[error("Cancelled")]
    Cancelled,
}

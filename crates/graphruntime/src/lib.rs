//! Graph execution runtime
//!
//! This crate compiles graph definitions into execution plans and runs
//! them: parallel dispatch of eligible nodes, barrier joins at fan-in
//! points, and serialized merging of each node's partial update into
//! the shared state store.

mod executor;
mod plan;
mod registry;
mod runner;
mod runtime;

pub use executor::{Executor, ExecutorConfig, NodeFailure, NodeStatus, RunOutcome};
pub use plan::ExecutionPlan;
pub use registry::StepRegistry;
pub use runner::run_step;
pub use runtime::{GraphRuntime, RuntimeConfig};

//! Core abstractions for the state graph engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the dynamic value type, the shared state store
//! with declared merge policies, the graph definition, and the step
//! contract. It contains no scheduling logic.

mod error;
mod events;
mod graph;
mod state;
mod step;
mod value;

pub use error::{EngineError, GraphError, StateError, StepError};
pub use events::{EventBus, EventEmitter, ExecutionEvent, RunId};
pub use graph::{GraphBuilder, GraphDefinition, NodeId, END, START};
pub use state::{MergePolicy, PartialUpdate, StateSchema, StateSnapshot, StateStore};
pub use step::{Step, StepContext};
pub use value::Value;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

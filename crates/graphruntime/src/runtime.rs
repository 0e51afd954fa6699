use crate::{ExecutionPlan, Executor, ExecutorConfig, RunOutcome, StepRegistry};
use graphcore::{
    EngineError, EventBus, ExecutionEvent, GraphDefinition, GraphError, PartialUpdate, StateSchema,
    StateStore,
};
use std::sync::Arc;
use std::time::Duration;

/// Facade tying the registry, event bus and executor together. One
/// runtime serves many runs; each run gets a fresh state store and
/// nothing survives between them.
pub struct GraphRuntime {
    registry: Arc<StepRegistry>,
    executor: Executor,
    event_bus: Arc<EventBus>,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(StepRegistry::new()), config)
    }

    pub fn with_registry(registry: Arc<StepRegistry>, config: RuntimeConfig) -> Self {
        let executor = Executor::new(ExecutorConfig {
            max_parallel: config.max_parallel,
            deadline: config.deadline,
            fail_fast: config.fail_fast,
        });
        Self {
            registry,
            executor,
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
        }
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Compile a definition into a reusable plan.
    pub fn compile(&self, graph: &GraphDefinition) -> Result<Arc<ExecutionPlan>, GraphError> {
        ExecutionPlan::compile(graph).map(Arc::new)
    }

    /// Run one execution over a fresh state seeded with the given
    /// initial fields.
    pub async fn run(
        &self,
        graph: &GraphDefinition,
        plan: &ExecutionPlan,
        schema: StateSchema,
        initial: PartialUpdate,
    ) -> Result<RunOutcome, EngineError> {
        let store = StateStore::seeded(schema, initial)?;
        self.executor.run(graph, plan, store, &self.event_bus).await
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_parallel: Option<usize>,
    pub deadline: Option<Duration>,
    pub fail_fast: bool,
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            deadline: None,
            fail_fast: false,
            event_buffer_size: 1000,
        }
    }
}

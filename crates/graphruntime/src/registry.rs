use graphcore::{GraphError, Step};
use std::collections::HashMap;
use std::sync::Arc;

/// Named registry of step implementations. Node names in a graph are
/// resolved against it at construction time; nothing is looked up by
/// reflection while a run is in flight.
#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under its own name. Re-registering a name
    /// replaces the previous entry.
    pub fn register(&mut self, step: Arc<dyn Step>) {
        let name = step.name().to_string();
        tracing::debug!("registering step: {}", name);
        self.steps.insert(name, step);
    }

    /// Resolve a step by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Step>, GraphError> {
        self.steps
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownStep(name.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.steps.keys().cloned().collect();
        names.sort();
        names
    }
}

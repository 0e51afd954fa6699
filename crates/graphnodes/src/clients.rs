use async_trait::async_trait;
use std::sync::Arc;

/// External search backend. One handle per engine, injected into the
/// steps that use it; nothing process-wide.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Engine tag used in transcripts (e.g. "google").
    fn engine(&self) -> &str;

    async fn search(&self, query: &str) -> anyhow::Result<String>;
}

/// External chat model used by the analysis and synthesis steps.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Deterministic offline search backend: echoes the query tagged with
/// the engine name. Doubles as the test stand-in.
pub struct StubSearch {
    engine: String,
}

impl StubSearch {
    pub fn new(engine: impl Into<String>) -> Arc<dyn SearchProvider> {
        Arc::new(Self {
            engine: engine.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    fn engine(&self) -> &str {
        &self.engine
    }

    async fn search(&self, query: &str) -> anyhow::Result<String> {
        Ok(format!(
            "[{}] Search results for: '{}'",
            self.engine.to_uppercase(),
            query
        ))
    }
}

/// Deterministic offline model: echoes its prompt under a model tag so
/// downstream assertions can find inputs verbatim.
pub struct StubChat;

impl StubChat {
    pub fn new() -> Arc<dyn ChatModel> {
        Arc::new(Self)
    }
}

#[async_trait]
impl ChatModel for StubChat {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("[model] {}", prompt))
    }
}

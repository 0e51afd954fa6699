use crate::clients::SearchProvider;
use crate::{MESSAGES, USER_QUESTION};
use async_trait::async_trait;
use graphcore::{PartialUpdate, Step, StepContext, StepError};
use std::sync::Arc;

/// Queries one search backend with the user question and writes the
/// raw results into the field this step owns.
pub struct WebSearchStep {
    name: String,
    result_field: String,
    client: Arc<dyn SearchProvider>,
}

impl WebSearchStep {
    pub fn google(client: Arc<dyn SearchProvider>) -> Arc<dyn Step> {
        Self::custom("search.google", "google_results", client)
    }

    pub fn bing(client: Arc<dyn SearchProvider>) -> Arc<dyn Step> {
        Self::custom("search.bing", "bing_results", client)
    }

    pub fn reddit(client: Arc<dyn SearchProvider>) -> Arc<dyn Step> {
        Self::custom("search.reddit", "reddit_results", client)
    }

    pub fn custom(
        name: impl Into<String>,
        result_field: impl Into<String>,
        client: Arc<dyn SearchProvider>,
    ) -> Arc<dyn Step> {
        Arc::new(Self {
            name: name.into(),
            result_field: result_field.into(),
            client,
        })
    }
}

#[async_trait]
impl Step for WebSearchStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let query = ctx.require_str(USER_QUESTION)?;
        ctx.events
            .info(format!("searching {} for: {}", self.client.engine(), query));

        let results = self
            .client
            .search(query)
            .await
            .map_err(|e| StepError::Failed(format!("{} search failed: {}", self.client.engine(), e)))?;

        Ok(PartialUpdate::new()
            .set(&self.result_field, results)
            .set(MESSAGES, format!("{}: search complete", self.name)))
    }
}

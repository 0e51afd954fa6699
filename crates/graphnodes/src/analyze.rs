use crate::clients::ChatModel;
use crate::MESSAGES;
use async_trait::async_trait;
use graphcore::{PartialUpdate, Step, StepContext, StepError};
use std::sync::Arc;

/// Runs the chat model over one source's raw search results and writes
/// the analysis field that source owns.
pub struct AnalyzeResultsStep {
    name: String,
    input_field: String,
    output_field: String,
    source_label: String,
    model: Arc<dyn ChatModel>,
}

impl AnalyzeResultsStep {
    pub fn google(model: Arc<dyn ChatModel>) -> Arc<dyn Step> {
        Arc::new(Self {
            name: "analyze.google".to_string(),
            input_field: "google_results".to_string(),
            output_field: "google_analysis".to_string(),
            source_label: "Google".to_string(),
            model,
        })
    }

    pub fn bing(model: Arc<dyn ChatModel>) -> Arc<dyn Step> {
        Arc::new(Self {
            name: "analyze.bing".to_string(),
            input_field: "bing_results".to_string(),
            output_field: "bing_analysis".to_string(),
            source_label: "Bing".to_string(),
            model,
        })
    }
}

#[async_trait]
impl Step for AnalyzeResultsStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let content = ctx.require_str(&self.input_field)?;
        ctx.events
            .info(format!("analyzing {} search results", self.source_label));

        let prompt = format!(
            "Analyze the following {} search results:\n{}",
            self.source_label, content
        );
        let analysis = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| StepError::Failed(format!("model call failed: {}", e)))?;

        Ok(PartialUpdate::new()
            .set(&self.output_field, analysis)
            .set(MESSAGES, format!("{}: analysis complete", self.name)))
    }
}

/// Reddit analysis works over the retrieved post bodies rather than
/// the raw search results, so it reads the array field.
pub struct AnalyzeRedditStep {
    model: Arc<dyn ChatModel>,
}

impl AnalyzeRedditStep {
    pub fn new(model: Arc<dyn ChatModel>) -> Arc<dyn Step> {
        Arc::new(Self { model })
    }
}

#[async_trait]
impl Step for AnalyzeRedditStep {
    fn name(&self) -> &str {
        "analyze.reddit"
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let posts = ctx
            .snapshot
            .get_array("reddit_post_data")
            .ok_or_else(|| StepError::Failed("missing required field 'reddit_post_data'".to_string()))?;
        ctx.events.info(format!("analyzing {} reddit posts", posts.len()));

        let combined: Vec<&str> = posts.iter().filter_map(|p| p.as_str()).collect();
        let prompt = format!(
            "Analyze the following Reddit posts:\n{}",
            combined.join("\n")
        );
        let analysis = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| StepError::Failed(format!("model call failed: {}", e)))?;

        Ok(PartialUpdate::new()
            .set("reddit_analysis", analysis)
            .set(MESSAGES, "analyze.reddit: analysis complete"))
    }
}

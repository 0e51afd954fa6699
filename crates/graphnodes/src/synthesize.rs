use crate::clients::ChatModel;
use crate::{FINAL_ANSWER, MESSAGES};
use async_trait::async_trait;
use graphcore::{PartialUpdate, Step, StepContext, StepError};
use std::sync::Arc;

/// Final barrier of the research graph: combines all three analyses
/// into one answer. Dispatch guarantees every analysis has merged.
pub struct SynthesizeStep {
    model: Arc<dyn ChatModel>,
}

impl SynthesizeStep {
    pub fn new(model: Arc<dyn ChatModel>) -> Arc<dyn Step> {
        Arc::new(Self { model })
    }
}

#[async_trait]
impl Step for SynthesizeStep {
    fn name(&self) -> &str {
        "synthesize"
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let google = ctx.require_str("google_analysis")?;
        let bing = ctx.require_str("bing_analysis")?;
        let reddit = ctx.require_str("reddit_analysis")?;
        ctx.events.info("synthesizing final answer");

        let combined = format!(
            "Google:\n{}\n\nBing:\n{}\n\nReddit:\n{}",
            google, bing, reddit
        );
        let answer = self
            .model
            .complete(&format!(
                "Synthesize the following analyses into a final answer:\n{}",
                combined
            ))
            .await
            .map_err(|e| StepError::Failed(format!("model call failed: {}", e)))?;

        Ok(PartialUpdate::new()
            .set(FINAL_ANSWER, answer)
            .set(MESSAGES, "synthesize: final answer ready"))
    }
}

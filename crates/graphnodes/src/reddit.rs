use crate::MESSAGES;
use async_trait::async_trait;
use graphcore::{PartialUpdate, Step, StepContext, StepError, Value};
use std::sync::Arc;

/// Picks the reddit posts worth retrieving out of the raw search
/// results. Runs at the first barrier: all three searches have merged
/// by the time it is dispatched.
pub struct SelectRedditPostsStep;

impl SelectRedditPostsStep {
    pub fn new() -> Arc<dyn Step> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Step for SelectRedditPostsStep {
    fn name(&self) -> &str {
        "reddit.select_posts"
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        // The selection heuristic is a placeholder: the raw results are
        // present in the snapshot but the stub backends carry no URLs.
        let _results = ctx.require_str("reddit_results")?;
        ctx.events.info("selecting reddit posts");

        let urls = vec![
            "https://reddit.com/example1".to_string(),
            "https://reddit.com/example2".to_string(),
        ];
        Ok(PartialUpdate::new()
            .set("selected_reddit_urls", urls)
            .set(MESSAGES, "reddit.select_posts: selection complete"))
    }
}

/// Fetches the content of each selected post.
pub struct RetrieveRedditPostsStep;

impl RetrieveRedditPostsStep {
    pub fn new() -> Arc<dyn Step> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Step for RetrieveRedditPostsStep {
    fn name(&self) -> &str {
        "reddit.retrieve_posts"
    }

    async fn run(&self, ctx: StepContext) -> Result<PartialUpdate, StepError> {
        let urls = ctx
            .snapshot
            .get_array("selected_reddit_urls")
            .ok_or_else(|| StepError::Failed("missing required field 'selected_reddit_urls'".to_string()))?;
        ctx.events.info(format!("retrieving {} reddit posts", urls.len()));

        let posts: Vec<Value> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                Value::String(format!(
                    "Post {} content from {}",
                    i + 1,
                    url.as_str().unwrap_or("(unknown url)")
                ))
            })
            .collect();

        Ok(PartialUpdate::new()
            .set("reddit_post_data", posts)
            .set(MESSAGES, "reddit.retrieve_posts: retrieval complete"))
    }
}

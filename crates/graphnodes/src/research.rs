use crate::analyze::{AnalyzeRedditStep, AnalyzeResultsStep};
use crate::clients::{ChatModel, SearchProvider, StubChat, StubSearch};
use crate::reddit::{RetrieveRedditPostsStep, SelectRedditPostsStep};
use crate::search::WebSearchStep;
use crate::synthesize::SynthesizeStep;
use crate::{FINAL_ANSWER, MESSAGES, USER_QUESTION};
use graphcore::{GraphBuilder, GraphDefinition, GraphError, StateSchema, END, START};
use graphruntime::StepRegistry;
use std::sync::Arc;

/// External handles for one research pipeline. Swap any of them for a
/// test double without touching the steps.
pub struct ResearchClients {
    pub google: Arc<dyn SearchProvider>,
    pub bing: Arc<dyn SearchProvider>,
    pub reddit: Arc<dyn SearchProvider>,
    pub model: Arc<dyn ChatModel>,
}

impl ResearchClients {
    /// Fully offline stub clients.
    pub fn stubs() -> Self {
        Self {
            google: StubSearch::new("google"),
            bing: StubSearch::new("bing"),
            reddit: StubSearch::new("reddit"),
            model: StubChat::new(),
        }
    }
}

/// Schema of one research run. `messages` is the only accumulating
/// field; every other field has exactly one writer in the graph, so
/// overwrite is race-free.
pub fn research_schema() -> StateSchema {
    StateSchema::new()
        .accumulating(MESSAGES)
        .field(USER_QUESTION)
        .field("google_results")
        .field("bing_results")
        .field("reddit_results")
        .field("selected_reddit_urls")
        .field("reddit_post_data")
        .field("google_analysis")
        .field("bing_analysis")
        .field("reddit_analysis")
        .field(FINAL_ANSWER)
}

/// Registers every research step against the given clients.
pub fn register_all(registry: &mut StepRegistry, clients: ResearchClients) {
    registry.register(WebSearchStep::google(clients.google));
    registry.register(WebSearchStep::bing(clients.bing));
    registry.register(WebSearchStep::reddit(clients.reddit));
    registry.register(SelectRedditPostsStep::new());
    registry.register(RetrieveRedditPostsStep::new());
    registry.register(AnalyzeResultsStep::google(clients.model.clone()));
    registry.register(AnalyzeResultsStep::bing(clients.model.clone()));
    registry.register(AnalyzeRedditStep::new(clients.model.clone()));
    registry.register(SynthesizeStep::new(clients.model));
}

/// Builds the research topology: three searches fan out from START,
/// join at post selection, retrieval fans out into three analyses,
/// which join again at synthesis.
pub fn research_graph(registry: &StepRegistry) -> Result<GraphDefinition, GraphError> {
    const SEARCHES: [&str; 3] = ["search.google", "search.bing", "search.reddit"];
    const ANALYSES: [&str; 3] = ["analyze.google", "analyze.bing", "analyze.reddit"];

    let mut builder = GraphBuilder::new();
    for name in SEARCHES
        .iter()
        .chain(ANALYSES.iter())
        .chain(["reddit.select_posts", "reddit.retrieve_posts", "synthesize"].iter())
    {
        builder.add_node(*name, registry.get(name)?)?;
    }

    for search in SEARCHES {
        builder.add_edge(START, search)?;
        builder.add_edge(search, "reddit.select_posts")?;
    }
    builder.add_edge("reddit.select_posts", "reddit.retrieve_posts")?;
    for analysis in ANALYSES {
        builder.add_edge("reddit.retrieve_posts", analysis)?;
        builder.add_edge(analysis, "synthesize")?;
    }
    builder.add_edge("synthesize", END)?;

    Ok(builder.build())
}

//! Research step library
//!
//! The concrete steps of the multi-source research graph: web and
//! reddit search, post selection and retrieval, per-source analysis,
//! and final synthesis. External effects (search engines, the chat
//! model) sit behind the client traits in [`clients`], so every step
//! here runs unchanged against stubs or real backends.

mod analyze;
mod clients;
mod reddit;
mod research;
mod search;
mod synthesize;

pub use analyze::{AnalyzeRedditStep, AnalyzeResultsStep};
pub use clients::{ChatModel, SearchProvider, StubChat, StubSearch};
pub use reddit::{RetrieveRedditPostsStep, SelectRedditPostsStep};
pub use research::{register_all, research_graph, research_schema, ResearchClients};
pub use search::WebSearchStep;
pub use synthesize::SynthesizeStep;

/// State field written by every step as a running transcript.
pub const MESSAGES: &str = "messages";
/// Seed field holding the user's question for the run.
pub const USER_QUESTION: &str = "user_question";
/// Field carrying the synthesized result of a successful run.
pub const FINAL_ANSWER: &str = "final_answer";

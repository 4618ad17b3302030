//! Athena Summarizer - topic summaries over clustered chat history.
//!
//! [`SummarizeAgent`] runs the clustering pipeline, serializes each
//! cluster's representatives into a prompt and parses the model's
//! structured answer into a [`SumResp`]. It can also turn a summary into
//! [`FollowUpResp`] questions.

pub mod agent;
pub mod error;
pub mod prompts;
pub mod types;

pub use agent::{format_clusters, format_topics, SummarizeAgent, ANALYTICAL_TEMPERATURE, TOP_P};
pub use error::{Result, SummarizerError};
pub use types::{FollowUpQuestion, FollowUpResp, SumResp, Summary, MAX_TOPICS};

//! Command implementations.
//!
//! Every command renders its output to a `String`; `main` prints it.

use std::path::Path;
use std::sync::Arc;

use athena_cluster::{composite_scores, ClusterPipeline, LexicalWeighter};
use athena_core::{ChatMessage, EngagementScorer};
use athena_llm::LlmProvider;
use athena_summarizer::{FollowUpResp, SumResp, SummarizeAgent};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{Commands, OutputFormat};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Longest message excerpt shown in text output.
const EXCERPT_CHARS: usize = 80;

/// Execute a command against `provider`.
pub async fn execute(command: Commands, provider: Arc<dyn LlmProvider>) -> Result<String> {
    match command {
        Commands::Score { input, format } => {
            let messages = load_messages(&input)?;
            score(&messages, format)
        }
        Commands::Cluster {
            input,
            tuning,
            highlights,
            format,
        } => {
            let messages = load_messages(&input)?;
            let pipeline = ClusterPipeline::new(provider, tuning.config())?;
            cluster(&pipeline, &messages, highlights, format).await
        }
        Commands::Summarize {
            input,
            tuning,
            persona,
            no_cluster,
            follow_up,
            format,
        } => {
            let messages = load_messages(&input)?;
            let agent = SummarizeAgent::new(provider, tuning.config())?.with_persona(persona);
            summarize(&agent, &messages, no_cluster, follow_up, format).await
        }
    }
}

/// Read a JSON array of messages.
pub fn load_messages(path: &Path) -> Result<Vec<ChatMessage>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let messages: Vec<ChatMessage> = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    debug!(path = %path.display(), count = messages.len(), "Loaded messages");
    Ok(messages)
}

#[derive(Debug, Serialize)]
struct MessageScore {
    message_id: i64,
    engagement: f64,
    lexical: f64,
    composite: f64,
}

fn score(messages: &[ChatMessage], format: OutputFormat) -> Result<String> {
    let lexical = LexicalWeighter::default().weigh(messages);
    let composite = composite_scores(messages, &lexical)?;

    let mut rows = Vec::with_capacity(messages.len());
    for ((message, &lexical), &composite) in messages.iter().zip(&lexical).zip(&composite) {
        rows.push(MessageScore {
            message_id: message.message_id,
            engagement: EngagementScorer::score(message)?,
            lexical,
            composite,
        });
    }

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            let mut out = format!(
                "{:<10} {:>10} {:>10} {:>10}  {}\n",
                "ID", "ENGAGEMENT", "LEXICAL", "COMPOSITE", "MESSAGE"
            );
            for (row, message) in rows.iter().zip(messages) {
                out.push_str(&format!(
                    "{:<10} {:>10.3} {:>10.3} {:>10.3}  {}\n",
                    row.message_id,
                    row.engagement,
                    row.lexical,
                    row.composite,
                    excerpt(&message.message)
                ));
            }
            Ok(out.trim_end().to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct ClusterReport<'a> {
    clusters: &'a [Vec<ChatMessage>],
    #[serde(skip_serializing_if = "Option::is_none")]
    highlights: Option<&'a [ChatMessage]>,
}

async fn cluster(
    pipeline: &ClusterPipeline,
    messages: &[ChatMessage],
    with_highlights: bool,
    format: OutputFormat,
) -> Result<String> {
    let clusters = pipeline.run(messages).await?;
    let highlights = if with_highlights {
        Some(pipeline.highlights(messages)?)
    } else {
        None
    };
    info!(clusters = clusters.len(), "Clustered messages");

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&ClusterReport {
            clusters: &clusters,
            highlights: highlights.as_deref(),
        })?),
        OutputFormat::Text => {
            if clusters.is_empty() {
                return Ok("No clusters found".to_string());
            }
            let mut out = String::new();
            for (i, cluster) in clusters.iter().enumerate() {
                out.push_str(&format!("Cluster {}:\n", i));
                for message in cluster {
                    out.push_str(&format!("  {}\n", message_line(message)));
                }
            }
            if let Some(highlights) = highlights {
                out.push_str("Highlights:\n");
                for message in &highlights {
                    out.push_str(&format!("  {}\n", message_line(message)));
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    summary: &'a SumResp,
    #[serde(skip_serializing_if = "Option::is_none")]
    follow_up: Option<&'a FollowUpResp>,
}

async fn summarize(
    agent: &SummarizeAgent,
    messages: &[ChatMessage],
    no_cluster: bool,
    follow_up: bool,
    format: OutputFormat,
) -> Result<String> {
    let summary = if no_cluster {
        agent.summarize_messages(messages).await?
    } else {
        agent.summarize_clusters(messages).await?
    };
    let questions = if follow_up {
        Some(agent.follow_up_questions(&summary).await?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&SummaryReport {
            summary: &summary,
            follow_up: questions.as_ref(),
        })?),
        OutputFormat::Text => {
            if summary.is_empty() {
                return Ok("Nothing to summarize".to_string());
            }
            let mut out = summary.to_string();
            if let Some(questions) = questions.filter(|q| !q.questions.is_empty()) {
                out.push_str("\n\nFollow-up questions:\n");
                out.push_str(&questions.to_string());
            }
            Ok(out)
        }
    }
}

fn message_line(message: &ChatMessage) -> String {
    let who = message
        .username
        .as_deref()
        .map(|u| format!("@{}", u))
        .or_else(|| message.first_name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    format!("[{}] {}: {}", message.message_id, who, excerpt(&message.message))
}

fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > EXCERPT_CHARS {
        let cut: String = line.chars().take(EXCERPT_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

//! Summaries of clustered chat history.

use std::sync::Arc;

use athena_cluster::{ClusterError, ClusterPipeline, ProcessorConfig};
use athena_core::{ChatMessage, ChatMessageReduced};
use athena_llm::{GenerateRequest, LlmProvider};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Result, SummarizerError};
use crate::prompts::{community_query, follow_up_query, with_persona, SYSTEM_PROMPT};
use crate::types::{FollowUpResp, SumResp};

/// Sampling temperature for summaries and questions.
pub const ANALYTICAL_TEMPERATURE: f32 = 0.45;

/// Nucleus sampling cutoff for summaries and questions.
pub const TOP_P: f32 = 0.8;

pub const DEFAULT_PERSONA: &str = "Athena";

/// Clusters a chat and asks the model to summarize it.
#[derive(Clone)]
pub struct SummarizeAgent {
    persona: String,
    pipeline: ClusterPipeline,
    provider: Arc<dyn LlmProvider>,
}

impl SummarizeAgent {
    /// Both clustering and generation go through `provider`.
    ///
    /// # Errors
    /// Returns [`SummarizerError::Pipeline`] if `config` is invalid.
    pub fn new(provider: Arc<dyn LlmProvider>, config: ProcessorConfig) -> Result<Self> {
        Ok(Self {
            persona: DEFAULT_PERSONA.to_string(),
            pipeline: ClusterPipeline::new(provider.clone(), config)?,
            provider,
        })
    }

    pub fn with_persona(mut self, name: impl Into<String>) -> Self {
        self.persona = name.into();
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn pipeline(&self) -> &ClusterPipeline {
        &self.pipeline
    }

    /// System prompt with the persona name filled in.
    pub fn system_prompt(&self) -> String {
        with_persona(SYSTEM_PROMPT, &self.persona)
    }

    /// Cluster `messages` and summarize the representatives.
    ///
    /// A chat with no clusters yields an empty summary without a model call.
    pub async fn summarize_clusters(&self, messages: &[ChatMessage]) -> Result<SumResp> {
        let clusters = self.pipeline.run(messages).await?;
        if clusters.is_empty() {
            info!(messages = messages.len(), "No clusters found, nothing to summarize");
            return Ok(SumResp::default());
        }

        let payload = format_clusters(&clusters)?;
        info!(clusters = clusters.len(), "Requesting cluster summary");
        let request = GenerateRequest::new(community_query(&payload))
            .with_system(self.system_prompt())
            .with_schema(SumResp::json_schema())
            .with_sampling(ANALYTICAL_TEMPERATURE, TOP_P);
        let summary: SumResp = self.generate(&request).await?;
        Ok(summary.truncated())
    }

    /// Summarize `messages` directly, without filtering or clustering.
    pub async fn summarize_messages(&self, messages: &[ChatMessage]) -> Result<SumResp> {
        if messages.is_empty() {
            return Ok(SumResp::default());
        }

        let reduced = reduce(messages)?;
        let payload = serde_json::to_string(&reduced)?;
        info!(messages = messages.len(), "Requesting message summary");
        let request = GenerateRequest::new(community_query(&payload))
            .with_system(self.system_prompt())
            .with_schema(SumResp::json_schema());
        let summary: SumResp = self.generate(&request).await?;
        Ok(summary.truncated())
    }

    /// Ask for follow-up questions about an existing summary.
    pub async fn follow_up_questions(&self, summary: &SumResp) -> Result<FollowUpResp> {
        if summary.is_empty() {
            return Ok(FollowUpResp::default());
        }

        let request = GenerateRequest::new(follow_up_query(&format_topics(summary)))
            .with_system(self.system_prompt())
            .with_schema(FollowUpResp::json_schema())
            .with_sampling(ANALYTICAL_TEMPERATURE, TOP_P);
        self.generate(&request).await
    }

    async fn generate<T: DeserializeOwned>(&self, request: &GenerateRequest) -> Result<T> {
        debug!(
            provider = self.provider.name(),
            prompt_chars = request.prompt.len(),
            "Calling generate"
        );
        let value = self.provider.generate(request).await?;
        serde_json::from_value(value).map_err(|e| SummarizerError::ResponseParse(e.to_string()))
    }
}

impl std::fmt::Debug for SummarizeAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizeAgent")
            .field("persona", &self.persona)
            .field("provider", &self.provider.name())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

fn reduce(messages: &[ChatMessage]) -> Result<Vec<ChatMessageReduced>> {
    messages
        .iter()
        .map(|m| {
            ChatMessageReduced::from_chat_message(m)
                .map_err(|e| SummarizerError::Pipeline(ClusterError::from(e)))
        })
        .collect()
}

/// Render clusters as the prompt payload: a `**Cluster i:**` header, then
/// each reduced message as JSON followed by `, `, then a blank line.
pub fn format_clusters(clusters: &[Vec<ChatMessage>]) -> Result<String> {
    let mut out = String::new();
    for (i, cluster) in clusters.iter().enumerate() {
        out.push_str(&format!("**Cluster {i}:**\n"));
        for message in reduce(cluster)? {
            out.push_str(&serde_json::to_string(&message)?);
            out.push_str(", ");
        }
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Render a summary as the follow-up payload, topics numbered from 1.
pub fn format_topics(summary: &SumResp) -> String {
    let body: String = summary
        .topics
        .iter()
        .enumerate()
        .map(|(i, topic)| format!("**Topic {}:**\n{}\n{}\n", i + 1, topic.topic_name, topic.summary))
        .collect();
    format!("[{body}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Summary;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_clusters() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let clusters = vec![
            vec![ChatMessage::new(7, "gm all", ts).with_sender("Ana", Some("ana".into()))],
            vec![ChatMessage::new(8, "coffee?", ts)],
        ];
        let rendered = format_clusters(&clusters).unwrap();

        assert!(rendered.starts_with("**Cluster 0:**\n{\"txt_id\":7,\"who\":\"Ana\",\"txt\":\"gm all\",\"username\":\"ana\",\"eng_score\":"));
        assert!(rendered.contains("}, \n\n**Cluster 1:**\n{\"txt_id\":8,\"who\":null"));
        assert!(rendered.ends_with("}, \n\n"));
    }

    #[test]
    fn test_format_clusters_rejects_invalid_message() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let clusters = vec![vec![ChatMessage::new(7, "", ts)]];
        assert!(matches!(
            format_clusters(&clusters),
            Err(SummarizerError::Pipeline(ClusterError::Message(_)))
        ));
    }

    #[test]
    fn test_format_topics() {
        let summary = SumResp {
            topics: vec![
                Summary {
                    topic_name: "Funding".into(),
                    summary: "Seed round closed.".into(),
                    message_ids: vec!["1".into()],
                },
                Summary {
                    topic_name: "Hiring".into(),
                    summary: "Two roles open.".into(),
                    message_ids: vec![],
                },
            ],
        };
        assert_eq!(
            format_topics(&summary),
            "[**Topic 1:**\nFunding\nSeed round closed.\n**Topic 2:**\nHiring\nTwo roles open.\n]"
        );
    }
}

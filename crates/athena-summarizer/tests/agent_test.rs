//! Summarizer tests against a scripted provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use athena_cluster::ProcessorConfig;
use athena_core::ChatMessage;
use athena_llm::{GenerateRequest, LlmError, LlmProvider};
use athena_summarizer::{SumResp, SummarizeAgent, SummarizerError, ANALYTICAL_TEMPERATURE, TOP_P};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::json;

/// Topic-keyword embeddings and a canned generation answer.
struct ScriptedProvider {
    answer: serde_json::Value,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    fn new(answer: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            answer,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, texts: &[String]) -> athena_llm::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("rust") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }

    async fn generate(&self, request: &GenerateRequest) -> athena_llm::Result<serde_json::Value> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.answer.clone())
    }
}

struct BrokenGenerator;

#[async_trait]
impl LlmProvider for BrokenGenerator {
    fn name(&self) -> &str {
        "broken"
    }

    async fn embed(&self, texts: &[String]) -> athena_llm::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0]).collect())
    }

    async fn generate(&self, _request: &GenerateRequest) -> athena_llm::Result<serde_json::Value> {
        Err(LlmError::Api {
            provider: "broken".into(),
            status: 500,
            body: "boom".into(),
        })
    }
}

fn config() -> ProcessorConfig {
    ProcessorConfig::default()
        .with_engagement_threshold(0.99)
        .with_retry_backoff(Duration::ZERO)
}

fn chat() -> Vec<ChatMessage> {
    let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let at = |m: i64| start + ChronoDuration::minutes(m);
    vec![
        ChatMessage::new(1, "Rust borrow checker question", at(0)).with_sender("Ana", None),
        ChatMessage::new(2, "Rust async runtime tips", at(1)).with_sender("Ben", None),
        ChatMessage::new(
            3,
            "Rust ownership lifetimes borrow checker async traits explained in depth",
            at(2),
        )
        .with_sender("Cy", Some("cy".into()))
        .with_reactions(10),
        ChatMessage::new(4, "Morning coffee brewing methods", at(3)).with_sender("Di", None),
        ChatMessage::new(5, "Coffee grinder recommendations please", at(4))
            .with_sender("Ed", None),
    ]
}

fn summary_answer() -> serde_json::Value {
    json!({
        "topics": [
            {"topic_name": "Rust", "summary": "Ownership explained (@cy).", "message_ids": ["3", "1"]},
            {"topic_name": "Coffee", "summary": "Brewing and grinders.", "message_ids": ["4", "5"]}
        ]
    })
}

#[tokio::test]
async fn test_summarize_clusters() {
    let provider = ScriptedProvider::new(summary_answer());
    let agent = SummarizeAgent::new(provider.clone(), config())
        .unwrap()
        .with_persona("Apollo");

    let summary = agent.summarize_clusters(&chat()).await.unwrap();
    assert_eq!(summary.topics.len(), 2);
    assert_eq!(
        summary.to_string(),
        "• **Rust**: Ownership explained (@cy). [3, 1]\n• **Coffee**: Brewing and grinders. [4, 5]"
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.system.as_deref().unwrap().starts_with("You are Apollo."));
    assert!(request.prompt.contains("**Cluster 0:**"));
    assert!(request.prompt.contains("**Cluster 1:**"));
    assert!(request.prompt.contains("\"txt_id\":3"));
    assert_eq!(request.temperature, Some(ANALYTICAL_TEMPERATURE));
    assert_eq!(request.top_p, Some(TOP_P));
    assert_eq!(request.schema, Some(SumResp::json_schema()));
}

#[tokio::test]
async fn test_summarize_messages_skips_clustering() {
    let provider = ScriptedProvider::new(summary_answer());
    let agent = SummarizeAgent::new(provider.clone(), config()).unwrap();

    agent.summarize_messages(&chat()).await.unwrap();

    let request = &provider.requests()[0];
    assert!(!request.prompt.contains("**Cluster"));
    assert!(request.prompt.contains("\"txt_id\":5"));
    assert!(request.system.as_deref().unwrap().starts_with("You are Athena."));
}

#[tokio::test]
async fn test_empty_chat_makes_no_model_call() {
    let provider = ScriptedProvider::new(summary_answer());
    let agent = SummarizeAgent::new(provider.clone(), config()).unwrap();

    assert!(agent.summarize_clusters(&[]).await.unwrap().is_empty());
    assert!(agent.summarize_messages(&[]).await.unwrap().is_empty());
    assert!(agent
        .follow_up_questions(&SumResp::default())
        .await
        .unwrap()
        .questions
        .is_empty());
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_follow_up_questions() {
    let provider = ScriptedProvider::new(json!({
        "questions": [
            {"question": "Why lifetimes?", "index": 1},
            {"question": "Best grinder?", "index": 2}
        ]
    }));
    let agent = SummarizeAgent::new(provider.clone(), config()).unwrap();
    let summary: SumResp = serde_json::from_value(summary_answer()).unwrap();

    let questions = agent.follow_up_questions(&summary).await.unwrap();
    assert_eq!(questions.to_string(), "1. Why lifetimes?\n2. Best grinder?");

    let request = &provider.requests()[0];
    assert!(request
        .prompt
        .contains("[**Topic 1:**\nRust\nOwnership explained (@cy).\n**Topic 2:**\nCoffee"));
}

#[tokio::test]
async fn test_malformed_answer_is_parse_error() {
    let provider = ScriptedProvider::new(json!({"topics": "not a list"}));
    let agent = SummarizeAgent::new(provider, config()).unwrap();

    let err = agent.summarize_clusters(&chat()).await.unwrap_err();
    assert!(matches!(err, SummarizerError::ResponseParse(_)));
}

#[tokio::test]
async fn test_provider_error_is_wrapped() {
    let agent = SummarizeAgent::new(Arc::new(BrokenGenerator), config()).unwrap();
    let err = agent.summarize_messages(&chat()).await.unwrap_err();
    assert!(matches!(err, SummarizerError::Provider(LlmError::Api { status: 500, .. })));
}

#[test]
fn test_invalid_config_is_pipeline_error() {
    let provider = ScriptedProvider::new(summary_answer());
    let err = SummarizeAgent::new(provider, config().with_embedding_attempts(0)).unwrap_err();
    assert!(matches!(err, SummarizerError::Pipeline(_)));
}

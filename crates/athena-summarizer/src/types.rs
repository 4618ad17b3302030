//! Structured responses requested from the model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Most topics a summary may contain.
pub const MAX_TOPICS: usize = 5;

/// One summarized topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub topic_name: String,
    /// One sentence.
    pub summary: String,
    /// Ids of the messages the topic was drawn from.
    pub message_ids: Vec<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "• **{}**: {} [{}]",
            self.topic_name,
            self.summary,
            self.message_ids.join(", ")
        )
    }
}

/// A chat summary: up to [`MAX_TOPICS`] topics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SumResp {
    pub topics: Vec<Summary>,
}

impl SumResp {
    /// JSON schema handed to the model with the request.
    pub fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "topics": {
                    "type": "array",
                    "description": format!("Summaries of the topics (max {MAX_TOPICS})"),
                    "items": {
                        "type": "object",
                        "properties": {
                            "topic_name": {"type": "string", "description": "Name of the topic"},
                            "summary": {"type": "string", "description": "Summary of the topic. One sentence per topic."},
                            "message_ids": {"type": "array", "items": {"type": "string"}, "description": "Message ids"}
                        },
                        "required": ["topic_name", "summary", "message_ids"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["topics"],
            "additionalProperties": false
        })
    }

    /// Drop topics beyond [`MAX_TOPICS`].
    pub fn truncated(mut self) -> Self {
        self.topics.truncate(MAX_TOPICS);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl fmt::Display for SumResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, topic) in self.topics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{topic}")?;
        }
        Ok(())
    }
}

/// A question the reader could ask next, tied to a topic (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    pub index: i64,
}

impl fmt::Display for FollowUpQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index, self.question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowUpResp {
    pub questions: Vec<FollowUpQuestion>,
}

impl FollowUpResp {
    pub fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "questions": {
                    "type": "array",
                    "description": "Follow-up questions",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string", "description": "Follow-up question"},
                            "index": {"type": "integer", "description": "Index of the question"}
                        },
                        "required": ["question", "index"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["questions"],
            "additionalProperties": false
        })
    }
}

impl fmt::Display for FollowUpResp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, question) in self.questions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{question}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(name: &str, ids: &[&str]) -> Summary {
        Summary {
            topic_name: name.to_string(),
            summary: format!("{name} happened."),
            message_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_summary_display() {
        let summary = topic("Funding", &["6641", "6922"]);
        assert_eq!(summary.to_string(), "• **Funding**: Funding happened. [6641, 6922]");
    }

    #[test]
    fn test_sumresp_display_joins_lines() {
        let resp = SumResp {
            topics: vec![topic("Hiring", &["1"]), topic("Growth", &[])],
        };
        assert_eq!(
            resp.to_string(),
            "• **Hiring**: Hiring happened. [1]\n• **Growth**: Growth happened. []"
        );
        assert_eq!(SumResp::default().to_string(), "");
    }

    #[test]
    fn test_truncated_caps_topics() {
        let resp = SumResp {
            topics: (0..7).map(|i| topic(&format!("t{i}"), &[])).collect(),
        };
        assert_eq!(resp.truncated().topics.len(), MAX_TOPICS);
    }

    #[test]
    fn test_parse_from_model_json() {
        let value = serde_json::json!({
            "topics": [{"topic_name": "Strategy", "summary": "Ship it.", "message_ids": ["7"]}]
        });
        let resp: SumResp = serde_json::from_value(value).unwrap();
        assert_eq!(resp.topics[0].message_ids, vec!["7"]);
    }

    #[test]
    fn test_follow_up_display() {
        let resp = FollowUpResp {
            questions: vec![
                FollowUpQuestion {
                    question: "Why is Base winning?".into(),
                    index: 1,
                },
                FollowUpQuestion {
                    question: "More on hiring?".into(),
                    index: 2,
                },
            ],
        };
        assert_eq!(resp.to_string(), "1. Why is Base winning?\n2. More on hiring?");
    }

    #[test]
    fn test_schemas_require_all_fields() {
        let schema = SumResp::json_schema();
        assert_eq!(schema["required"], serde_json::json!(["topics"]));
        let schema = FollowUpResp::json_schema();
        assert_eq!(
            schema["properties"]["questions"]["items"]["required"],
            serde_json::json!(["question", "index"])
        );
    }
}

//! Prompt templates.
//!
//! Placeholders are `{name}`, `{messages}` and `{summary}`, filled with
//! plain string replacement.

/// System prompt; `{name}` is the persona name.
pub const SYSTEM_PROMPT: &str = r#"You are {name}. You read group chat history and write short, factual topic summaries.

Rules:
- At most 5 topics, one sentence each, under 25 words
- Prefer concrete facts: numbers, names, decisions, links
- Mention @usernames where they matter
- Merge messages into one topic only when the summary stays clear"#;

/// Query for summarizing clustered (or raw) messages.
pub const COMMUNITY_QUERY: &str = r#"Summarize the following chat messages by topic.

Input:
```json
{messages}
```

Answer with a JSON object {"topics": [...]}, where each topic has "topic_name" (1-3 word category), "summary" and "message_ids" (the txt_id values the topic is drawn from, as strings)."#;

/// Query for follow-up questions on an existing summary.
pub const FOLLOW_UP_QUERY: &str = r#"Given these summarized chat topics, write 3 to 5 short follow-up questions (8 words max each).

Input:
```json
{summary}
```

Answer with a JSON object {"questions": [...]}, where each entry has "question" and "index" (the 1-based topic number it relates to)."#;

/// Substitute the persona name into a template.
pub fn with_persona(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

pub fn community_query(messages: &str) -> String {
    COMMUNITY_QUERY.replace("{messages}", messages)
}

pub fn follow_up_query(summary: &str) -> String {
    FOLLOW_UP_QUERY.replace("{summary}", summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_substitution() {
        let prompt = with_persona(SYSTEM_PROMPT, "Athena");
        assert!(prompt.starts_with("You are Athena."));
        assert!(!prompt.contains("{name}"));
    }

    #[test]
    fn test_queries_embed_payload() {
        assert!(community_query("PAYLOAD").contains("```json\nPAYLOAD\n```"));
        assert!(follow_up_query("TOPICS").contains("TOPICS"));
        assert!(!follow_up_query("TOPICS").contains("{summary}"));
    }
}

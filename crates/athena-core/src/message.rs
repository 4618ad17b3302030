//! Chat message model consumed by the clustering pipeline.
//!
//! A [`ChatMessage`] is produced by the transport layer once sender metadata,
//! link previews and reaction counts have been resolved. Field names follow
//! the JSON export format so message dumps can be loaded directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::EngagementScorer;
use crate::error::{MessageError, Result};

/// Highest valid media ordinal (audio).
pub const MAX_MEDIA_SCORE: u8 = 4;

/// Kind of media attached to a message, ordered by how much information
/// it usually carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// No media, or media we do not score.
    #[default]
    None,
    Document,
    Photo,
    Video,
    Audio,
}

impl MediaKind {
    /// Ordinal used by the engagement formula.
    pub fn score(self) -> u8 {
        match self {
            MediaKind::None => 0,
            MediaKind::Document => 1,
            MediaKind::Photo => 2,
            MediaKind::Video => 3,
            MediaKind::Audio => 4,
        }
    }
}

/// A single chat message with the structural signals used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier within its chat.
    pub message_id: i64,

    /// Sender's first name.
    #[serde(default)]
    pub first_name: Option<String>,

    /// Sender's handle.
    #[serde(default)]
    pub username: Option<String>,

    /// Message body.
    pub message: String,

    /// When the message was sent.
    pub timestamp: DateTime<Utc>,

    /// Title of the link preview, if any.
    #[serde(default)]
    pub link_preview_title: Option<String>,

    /// Description of the link preview, if any.
    #[serde(default)]
    pub link_preview_description: Option<String>,

    /// Sent by the account running the assistant.
    #[serde(default)]
    pub is_self: bool,

    /// Sent by a bot.
    #[serde(default)]
    pub is_bot: bool,

    #[serde(default)]
    pub is_premium: bool,

    #[serde(default)]
    pub is_contact: bool,

    /// Mentions another user.
    #[serde(default)]
    pub has_mention: bool,

    /// Contains a URL entity.
    #[serde(default)]
    pub has_link: bool,

    /// Total reactions across all emoji.
    #[serde(default)]
    pub reaction_count: u32,

    /// Media ordinal, see [`MediaKind::score`].
    #[serde(default)]
    pub media_score: u8,
}

impl ChatMessage {
    /// Create a plain text message with no sender attributes.
    pub fn new(message_id: i64, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            message_id,
            first_name: None,
            username: None,
            message: message.into(),
            timestamp,
            link_preview_title: None,
            link_preview_description: None,
            is_self: false,
            is_bot: false,
            is_premium: false,
            is_contact: false,
            has_mention: false,
            has_link: false,
            reaction_count: 0,
            media_score: 0,
        }
    }

    /// Set the sender's first name and handle.
    pub fn with_sender(mut self, first_name: impl Into<String>, username: Option<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.username = username;
        self
    }

    /// Attach a link preview.
    pub fn with_link_preview(
        mut self,
        title: Option<String>,
        description: Option<String>,
    ) -> Self {
        self.link_preview_title = title;
        self.link_preview_description = description;
        self
    }

    /// Set the reaction count.
    pub fn with_reactions(mut self, count: u32) -> Self {
        self.reaction_count = count;
        self
    }

    /// Set the attached media kind.
    pub fn with_media(mut self, kind: MediaKind) -> Self {
        self.media_score = kind.score();
        self
    }

    /// Mark the message as sent by the assistant's own account.
    pub fn sent_by_self(mut self) -> Self {
        self.is_self = true;
        self
    }

    /// Mark the message as sent by a bot.
    pub fn sent_by_bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Check that the message can be scored.
    ///
    /// # Errors
    /// Returns [`MessageError::Validation`] if the body is blank or the
    /// media ordinal is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(MessageError::validation(
                self.message_id,
                "message body is empty",
            ));
        }
        if self.media_score > MAX_MEDIA_SCORE {
            return Err(MessageError::validation(
                self.message_id,
                format!(
                    "media_score {} exceeds maximum {}",
                    self.media_score, MAX_MEDIA_SCORE
                ),
            ));
        }
        Ok(())
    }

    /// Length of body plus link preview, in characters.
    pub fn combined_length(&self) -> usize {
        let title = self.link_preview_title.as_deref().map_or(0, |t| t.chars().count());
        let description = self
            .link_preview_description
            .as_deref()
            .map_or(0, |d| d.chars().count());
        self.message.chars().count() + title + description
    }

    /// Text sent to the embedding model: the body followed by the link
    /// preview title and description on their own lines.
    pub fn embedding_text(&self) -> String {
        let mut text = self.message.clone();
        if let Some(title) = self.link_preview_title.as_deref().filter(|t| !t.is_empty()) {
            text.push('\n');
            text.push_str(title);
        }
        if let Some(description) = self
            .link_preview_description
            .as_deref()
            .filter(|d| !d.is_empty())
        {
            text.push('\n');
            text.push_str(description);
        }
        text
    }

    /// Engagement score in `[0, 1]`, see [`EngagementScorer`].
    pub fn engagement_score(&self) -> Result<f64> {
        EngagementScorer::score(self)
    }
}

/// A message paired with its batch-relative lexical weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMessage {
    pub message: ChatMessage,
    pub lexical_score: f64,
}

impl ScoredMessage {
    pub fn new(message: ChatMessage, lexical_score: f64) -> Self {
        Self {
            message,
            lexical_score,
        }
    }
}

/// Compact view of a message used when serializing clusters into prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageReduced {
    pub txt_id: i64,
    pub who: Option<String>,
    pub txt: String,
    pub username: Option<String>,
    pub eng_score: f64,
}

impl ChatMessageReduced {
    /// Reduce a full message, computing its engagement score.
    ///
    /// # Errors
    /// Propagates validation errors from scoring.
    pub fn from_chat_message(message: &ChatMessage) -> Result<Self> {
        Ok(Self {
            txt_id: message.message_id,
            who: message.first_name.clone(),
            txt: message.message.clone(),
            username: message.username.clone(),
            eng_score: message.engagement_score()?,
        })
    }
}

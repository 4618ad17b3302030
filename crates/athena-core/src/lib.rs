//! Athena Core - message model and scoring shared by every Athena crate.
//!
//! - **message**: [`ChatMessage`] as delivered by the transport layer, plus
//!   the [`ScoredMessage`] and [`ChatMessageReduced`] views
//! - **engagement**: structural engagement scoring into `[0, 1]`
//! - **config**: state directory and `.env` loading

pub mod config;
pub mod engagement;
pub mod error;
pub mod message;

pub use engagement::{EngagementScorer, MAX_SCORE, MIN_SCORE};
pub use error::{MessageError, Result};
pub use message::{ChatMessage, ChatMessageReduced, MediaKind, ScoredMessage};

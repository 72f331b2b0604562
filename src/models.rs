//! Core data types that flow through the ingestion and reply pipelines.

use serde::{Deserialize, Serialize};

/// The persisted, retrievable unit: one embedded chunk of document text.
///
/// `id` is a content address — a deterministic function of `content`
/// alone (see [`crate::chunk::content_id`]). Identical text always maps
/// to the same id, which is what makes bulk inserts idempotent.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Originating filename, if known.
    pub source: Option<String>,
}

/// Speaker role in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => anyhow::bail!("unknown role: {}", other),
        }
    }
}

/// One role/content pair, as sent to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A stored conversation turn, read back in chronological order.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub user_id: i64,
    pub role: Role,
    pub content: String,
}

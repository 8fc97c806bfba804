//! Canonical data models shared by every ingestion path.
//!
//! Whatever the source format (tree-mapping export, flat message list,
//! role-tagged transcript), the loader produces [`Conversation`]s made of
//! [`Message`]s in this single shape. Records are built once during a load
//! and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Title used when a source carries none.
pub const DEFAULT_TITLE: &str = "Untitled Conversation";

/// Platform name used when a source does not identify itself.
pub const UNKNOWN_PLATFORM: &str = "Unknown";

/// Speaker of a message. Every source label collapses onto these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    pub platform: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A message before it is attached to its conversation.
///
/// Normalizers produce drafts; [`Conversation::assemble`] trims content,
/// drops empty turns, stamps the platform and fixes up identifiers.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    pub metadata: Map<String, Value>,
}

/// How [`Conversation::assemble`] orders messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    /// Stable sort by timestamp.
    Chronological,
    /// Keep the given order (root-to-leaf path of a tree export).
    Path,
}

/// An ordered sequence of messages plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Identity and labels of a conversation under construction.
#[derive(Debug, Clone)]
pub struct ConversationHeader {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub metadata: Map<String, Value>,
}

impl Conversation {
    /// Build a conversation from drafts.
    ///
    /// Returns `None` when no message survives trimming: a conversation
    /// without messages has no date bounds and is not kept.
    pub fn assemble(
        header: ConversationHeader,
        drafts: Vec<MessageDraft>,
        order: MessageOrder,
    ) -> Option<Conversation> {
        let mut drafts: Vec<MessageDraft> = drafts
            .into_iter()
            .filter_map(|mut d| {
                let trimmed = d.content.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != d.content.len() {
                    d.content = trimmed.to_string();
                }
                Some(d)
            })
            .collect();

        if drafts.is_empty() {
            return None;
        }

        if order == MessageOrder::Chronological {
            drafts.sort_by_key(|d| d.timestamp);
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(drafts.len());
        let messages: Vec<Message> = drafts
            .into_iter()
            .enumerate()
            .map(|(idx, d)| {
                let mut id = d.id;
                if !seen.insert(id.clone()) {
                    id = format!("{}_{}", id, idx);
                    seen.insert(id.clone());
                }
                Message {
                    id,
                    timestamp: d.timestamp,
                    role: d.role,
                    content: d.content,
                    platform: header.platform.clone(),
                    metadata: d.metadata,
                }
            })
            .collect();

        // Non-empty by the check above.
        let start_date = messages.iter().map(|m| m.timestamp).min()?;
        let end_date = messages.iter().map(|m| m.timestamp).max()?;

        Some(Conversation {
            id: header.id,
            title: header.title,
            platform: header.platform,
            start_date,
            end_date,
            messages,
            metadata: header.metadata,
        })
    }
}

/// Map a platform label onto its canonical spelling.
///
/// Known platforms are matched case-insensitively; unknown labels are kept
/// as given and an empty label becomes [`UNKNOWN_PLATFORM`].
pub fn canonical_platform(label: Option<&str>) -> String {
    let raw = label.map(str::trim).unwrap_or_default();
    match raw.to_lowercase().as_str() {
        "" => UNKNOWN_PLATFORM.to_string(),
        "chatgpt" | "openai" => "ChatGPT".to_string(),
        "claude" | "anthropic" => "Claude".to_string(),
        "gemini" | "bard" => "Gemini".to_string(),
        _ => raw.to_string(),
    }
}

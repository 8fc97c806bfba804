//! Schema normalization.
//!
//! Converts parsed exports into canonical [`Conversation`]s. Three JSON
//! shapes are recognized ([`ExportShape`]):
//!
//! | Shape | Detected by | Handling |
//! |-------|-------------|----------|
//! | Collection | top-level array | each conversation-like element normalized on its own |
//! | Flat messages | `messages` / `chat_messages` array | messages read field by field, sorted by time |
//! | Tree mapping | `mapping` object | canonical path via [`crate::tree`], path order kept |
//!
//! An object exposing both a mapping and a message list is resolved by
//! [`DualShapePolicy`]. Role-tagged transcripts are turned into
//! conversations by [`transcript_conversation`].
//!
//! Field aliases cover the common export vocabularies (`id`/`uuid`,
//! `title`/`name`, `role`/`author.role`/`sender`, `content`/`text`).
//! Missing message timestamps fall back to the conversation's own start
//! time, then to the batch clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::NormalizeError;
use crate::models::{
    canonical_platform, Conversation, ConversationHeader, MessageDraft, MessageOrder,
    DEFAULT_TITLE,
};
use crate::role::normalize_role;
use crate::timestamp::{normalize_time, parse_instant, BatchClock, TimeUnit};
use crate::transcript::parse_transcript;
use crate::tree::{parse_mapping, resolve_messages};

const TREE_DEFAULT_TITLE: &str = "ChatGPT Conversation";
const TREE_DEFAULT_PLATFORM: &str = "ChatGPT";
const TRANSCRIPT_PLATFORM: &str = "Claude";

/// What to do with an object that has both a `mapping` and a message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DualShapePolicy {
    /// Normalize as a tree export only.
    #[default]
    PreferMapping,
    /// Normalize under both interpretations and keep both results.
    Both,
}

/// Shape of a parsed JSON export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    Collection,
    FlatMessages,
    TreeMapping,
    /// Exposes both a mapping and a message list.
    Dual,
    Unrecognized,
}

/// Settings shared by every normalization in one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub clock: BatchClock,
    pub dual_shape: DualShapePolicy,
}

/// Result of normalizing one JSON document.
#[derive(Debug, Default)]
pub struct Normalized {
    pub conversations: Vec<Conversation>,
    /// Conversations that could not be normalized, labelled by source.
    pub failures: Vec<(String, NormalizeError)>,
    /// Whether any conversation-shaped value was found.
    pub recognized: bool,
}

/// Flavor of a transcript source, recorded in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    Markdown,
    Text,
}

impl TranscriptKind {
    fn as_str(&self) -> &'static str {
        match self {
            TranscriptKind::Markdown => "markdown",
            TranscriptKind::Text => "text",
        }
    }
}

pub fn detect_shape(value: &Value) -> ExportShape {
    match value {
        Value::Array(_) => ExportShape::Collection,
        Value::Object(obj) => match (mapping_of(obj).is_some(), message_list(obj).is_some()) {
            (true, true) => ExportShape::Dual,
            (true, false) => ExportShape::TreeMapping,
            (false, true) => ExportShape::FlatMessages,
            (false, false) => ExportShape::Unrecognized,
        },
        _ => ExportShape::Unrecognized,
    }
}

/// Parse and normalize a JSON document.
pub fn normalize_str(
    text: &str,
    source: &str,
    opts: &NormalizeOptions,
) -> Result<Normalized, NormalizeError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(normalize_json(&value, source, opts))
}

/// Normalize an already-parsed JSON document.
pub fn normalize_json(value: &Value, source: &str, opts: &NormalizeOptions) -> Normalized {
    let mut out = Normalized::default();
    match value {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(obj) => {
                        let label = format!("{}#{}", source, idx);
                        normalize_object(obj, &label, source, opts, &mut out);
                    }
                    None => tracing::debug!(source, idx, "skipping non-object array element"),
                }
            }
        }
        Value::Object(obj) => normalize_object(obj, source, source, opts, &mut out),
        _ => {}
    }
    if !out.recognized {
        tracing::debug!(source, "no conversation shape found");
    }
    out
}

fn normalize_object(
    obj: &Map<String, Value>,
    label: &str,
    source: &str,
    opts: &NormalizeOptions,
    out: &mut Normalized,
) {
    let mapping = mapping_of(obj);
    let messages = message_list(obj);
    if mapping.is_none() && messages.is_none() {
        return;
    }
    out.recognized = true;

    if let Some(raw) = mapping {
        match tree_conversation(obj, raw, source, opts) {
            Ok(Some(conv)) => out.conversations.push(conv),
            Ok(None) => tracing::debug!(source = label, "tree conversation has no messages"),
            Err(e) => out.failures.push((label.to_string(), e)),
        }
        if opts.dual_shape == DualShapePolicy::PreferMapping {
            return;
        }
    }

    if let Some(list) = messages {
        let id_suffix = mapping.map(|_| "_messages");
        match flat_conversation(obj, list, source, id_suffix, opts) {
            Some(conv) => out.conversations.push(conv),
            None => tracing::debug!(source = label, "conversation has no messages"),
        }
    }
}

fn tree_conversation(
    obj: &Map<String, Value>,
    raw: &Map<String, Value>,
    source: &str,
    opts: &NormalizeOptions,
) -> Result<Option<Conversation>, NormalizeError> {
    let mapping = parse_mapping(raw)?;
    let current = obj.get("current_node").and_then(Value::as_str);
    let path = resolve_messages(&mapping, current)?;

    let drafts = path
        .into_iter()
        .map(|(node_id, message)| {
            let mut metadata = Map::new();
            if let Some(model) = message.pointer("/metadata/model_slug").and_then(Value::as_str) {
                metadata.insert("model".to_string(), Value::String(model.to_string()));
            }
            metadata.insert("node_id".to_string(), Value::String(node_id.to_string()));
            MessageDraft {
                id: message
                    .as_object()
                    .and_then(|m| id_field(m, &["id"]))
                    .unwrap_or_else(|| node_id.to_string()),
                timestamp: normalize_time(message.get("create_time"), TimeUnit::Seconds, &opts.clock),
                role: normalize_role(message.pointer("/author/role").and_then(Value::as_str)),
                content: extract_content(message.get("content")),
                metadata,
            }
        })
        .collect();

    let mut metadata = base_metadata(obj, source);
    if let Some(model) = obj.get("default_model_slug").and_then(Value::as_str) {
        metadata.insert("model".to_string(), Value::String(model.to_string()));
    }

    let header = ConversationHeader {
        id: conversation_id(obj, opts),
        title: str_field(obj, &["title"]).unwrap_or_else(|| TREE_DEFAULT_TITLE.to_string()),
        platform: match str_field(obj, &["platform"]) {
            Some(p) => canonical_platform(Some(&p)),
            None => TREE_DEFAULT_PLATFORM.to_string(),
        },
        metadata,
    };

    Ok(Conversation::assemble(header, drafts, MessageOrder::Path))
}

fn flat_conversation(
    obj: &Map<String, Value>,
    list: &[Value],
    source: &str,
    id_suffix: Option<&str>,
    opts: &NormalizeOptions,
) -> Option<Conversation> {
    let fallback_time = conversation_start(obj).unwrap_or_else(|| opts.clock.now());

    let drafts = list
        .iter()
        .enumerate()
        .filter_map(|(idx, msg)| {
            let fields = msg.as_object()?;
            let timestamp = parse_instant(fields.get("timestamp"), TimeUnit::Millis)
                .or_else(|| parse_instant(fields.get("create_time"), TimeUnit::Seconds))
                .or_else(|| parse_instant(fields.get("created_at"), TimeUnit::Millis))
                .unwrap_or(fallback_time);
            let role = str_field(fields, &["role"])
                .or_else(|| msg.pointer("/author/role").and_then(Value::as_str).map(String::from))
                .or_else(|| str_field(fields, &["sender"]));
            let mut content = extract_content(fields.get("content"));
            if content.trim().is_empty() {
                content = str_field(fields, &["text"]).unwrap_or_default();
            }
            Some(MessageDraft {
                id: id_field(fields, &["id", "uuid"]).unwrap_or_else(|| format!("msg_{}", idx)),
                timestamp,
                role: normalize_role(role.as_deref()),
                content,
                metadata: fields
                    .get("metadata")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
        })
        .collect();

    let platform = match str_field(obj, &["platform"]) {
        Some(p) => canonical_platform(Some(&p)),
        None if obj.contains_key("chat_messages") => TRANSCRIPT_PLATFORM.to_string(),
        None => canonical_platform(None),
    };

    let mut id = conversation_id(obj, opts);
    if let Some(suffix) = id_suffix {
        id.push_str(suffix);
    }

    let header = ConversationHeader {
        id,
        title: str_field(obj, &["title", "name"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        platform,
        metadata: base_metadata(obj, source),
    };

    Conversation::assemble(header, drafts, MessageOrder::Chronological)
}

/// Turn a role-tagged transcript into a conversation.
///
/// The id is derived from `source`, so reloading the same file yields the
/// same id. Every message carries the batch instant.
pub fn transcript_conversation(
    text: &str,
    source: &str,
    kind: TranscriptKind,
    opts: &NormalizeOptions,
) -> Option<Conversation> {
    let now = opts.clock.now();
    let drafts = parse_transcript(text)
        .into_iter()
        .enumerate()
        .map(|(idx, turn)| MessageDraft {
            id: format!("msg_{}", idx),
            timestamp: now,
            role: turn.role,
            content: turn.content,
            metadata: Map::new(),
        })
        .collect();

    let mut metadata = Map::new();
    metadata.insert("format".to_string(), Value::String(kind.as_str().to_string()));
    metadata.insert("source".to_string(), Value::String(source.to_string()));

    let header = ConversationHeader {
        id: format!("transcript_{}", short_hash(source)),
        title: format!("Conversation from {}", source),
        platform: TRANSCRIPT_PLATFORM.to_string(),
        metadata,
    };

    Conversation::assemble(header, drafts, MessageOrder::Chronological)
}

/// Flatten a content value into one string.
///
/// Accepts a plain string, a list of fragments (strings or `{ "text": .. }`
/// objects), or an object with `parts` or `text`.
pub fn extract_content(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => join_fragments(items),
        Some(Value::Object(obj)) => {
            if let Some(parts) = obj.get("parts").and_then(Value::as_array) {
                join_fragments(parts)
            } else {
                obj.get("text")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_default()
            }
        }
        _ => String::new(),
    }
}

fn join_fragments(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(o) => o.get("text").and_then(Value::as_str),
            _ => None,
        })
        .collect()
}

fn mapping_of(obj: &Map<String, Value>) -> Option<&Map<String, Value>> {
    obj.get("mapping").and_then(Value::as_object)
}

fn message_list(obj: &Map<String, Value>) -> Option<&Vec<Value>> {
    obj.get("messages")
        .and_then(Value::as_array)
        .or_else(|| obj.get("chat_messages").and_then(Value::as_array))
}

fn conversation_start(obj: &Map<String, Value>) -> Option<DateTime<Utc>> {
    parse_instant(obj.get("startDate"), TimeUnit::Millis)
        .or_else(|| parse_instant(obj.get("create_time"), TimeUnit::Seconds))
        .or_else(|| parse_instant(obj.get("created_at"), TimeUnit::Millis))
}

fn conversation_id(obj: &Map<String, Value>, opts: &NormalizeOptions) -> String {
    id_field(obj, &["id", "uuid", "conversation_id"]).unwrap_or_else(|| synthesize_id(opts))
}

/// `conv_<batch millis>_<random suffix>`; not stable across loads.
fn synthesize_id(opts: &NormalizeOptions) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("conv_{}_{}", opts.clock.now().timestamp_millis(), &suffix[..9])
}

fn short_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..16].to_string()
}

fn base_metadata(obj: &Map<String, Value>, source: &str) -> Map<String, Value> {
    let mut metadata = obj
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    metadata.insert("source".to_string(), Value::String(source.to_string()));
    metadata
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// An identifier field, accepting strings and numbers.
fn id_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

//! Error types for the ingestion engine.
//!
//! These only ever describe a single source (file, archive entry, or one
//! conversation inside a file). The loader turns them into
//! [`FailedSource`](crate::loader::FailedSource) records; none of them abort
//! a run.

/// Structural problems in a tree-mapping export.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node mapping is empty")]
    EmptyMapping,

    #[error("node mapping has no root node (every node has a parent)")]
    NoRoot,

    #[error("cycle detected at node '{0}'")]
    Cycle(String),

    #[error("node '{node}' references missing parent '{parent}'")]
    DanglingParent { node: String, parent: String },

    #[error("node '{node}' is malformed: {reason}")]
    InvalidNode { node: String, reason: String },
}

/// Failures opening or reading a compressed bundle.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("cannot open archive: {0}")]
    Open(String),

    #[error("entry '{name}' could not be read: {reason}")]
    Entry { name: String, reason: String },

    #[error("entry '{name}' exceeds size limit ({limit} bytes)")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("entry '{0}' is not valid UTF-8")]
    NotUtf8(String),
}

/// Failures turning one source into canonical conversations.
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("content is not valid UTF-8")]
    NotUtf8,

    #[error("unresolvable conversation tree: {0}")]
    Tree(#[from] TreeError),
}

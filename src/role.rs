//! Speaker-label normalization.
//!
//! Every export names its speakers differently (`user`, `human`, `sender`,
//! the platform's own name...). [`normalize_role`] folds all of them onto
//! [`Role`]. It never fails: unknown and absent labels are treated as the
//! human side of the conversation.

use crate::models::Role;

/// Labels that identify the assistant side. Platform names appear here
/// because several exports put them in the author field.
const ASSISTANT_LABELS: &[&str] = &[
    "assistant",
    "system",
    "ai",
    "model",
    "bot",
    "chatgpt",
    "gpt",
    "claude",
    "gemini",
    "bard",
];

/// Map a speaker label to a [`Role`]. Matching is case-insensitive.
///
/// `system` collapses into [`Role::Assistant`]; anything unrecognized
/// (including `None`) defaults to [`Role::Human`].
pub fn normalize_role(label: Option<&str>) -> Role {
    let Some(label) = label else {
        return Role::Human;
    };
    match label.trim().to_lowercase().as_str() {
        l if ASSISTANT_LABELS.contains(&l) => Role::Assistant,
        // `user`, `human`, and everything unrecognized.
        _ => Role::Human,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels() {
        assert_eq!(normalize_role(Some("user")), Role::Human);
        assert_eq!(normalize_role(Some("Human")), Role::Human);
        assert_eq!(normalize_role(Some("assistant")), Role::Assistant);
        assert_eq!(normalize_role(Some("ASSISTANT")), Role::Assistant);
        assert_eq!(normalize_role(Some("ChatGPT")), Role::Assistant);
        assert_eq!(normalize_role(Some("claude")), Role::Assistant);
        assert_eq!(normalize_role(Some("model")), Role::Assistant);
    }

    #[test]
    fn system_collapses_into_assistant() {
        assert_eq!(normalize_role(Some("system")), Role::Assistant);
        assert_eq!(normalize_role(Some("System")), Role::Assistant);
    }

    #[test]
    fn unknown_and_absent_default_to_human() {
        assert_eq!(normalize_role(None), Role::Human);
        assert_eq!(normalize_role(Some("")), Role::Human);
        assert_eq!(normalize_role(Some("tool")), Role::Human);
        assert_eq!(normalize_role(Some("narrator")), Role::Human);
    }

    #[test]
    fn total_over_arbitrary_input() {
        for label in ["", " ", "ü", "\u{0}", "user\n", "🤖", "a very long label indeed"] {
            let role = normalize_role(Some(label));
            assert!(matches!(role, Role::Human | Role::Assistant));
        }
    }
}

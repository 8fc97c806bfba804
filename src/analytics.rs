//! Corpus analytics.
//!
//! Two read-only passes over a loaded corpus: [`corpus_stats`] aggregates
//! totals and per-platform counts, and [`detect_themes`] scans message
//! content for a keyword set and reports the keywords mentioned often enough
//! to count as a theme.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Conversation, Role};

/// Keywords scanned when the caller supplies none.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "consciousness",
    "collaboration",
    "ai",
    "pattern",
    "recognition",
    "memory",
    "growth",
    "rivalry",
    "competition",
    "cooperation",
];

/// A keyword must be found in more than this many messages.
pub const DEFAULT_THEME_THRESHOLD: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub keyword: String,
    pub frequency: usize,
}

/// Count, per keyword, the messages whose content contains it
/// (case-insensitive substring). Keywords with a count above `threshold`
/// are returned, most frequent first.
pub fn detect_themes(
    conversations: &[Conversation],
    keywords: &[String],
    threshold: usize,
) -> Vec<Theme> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let mut counts = vec![0usize; needles.len()];

    for message in conversations.iter().flat_map(|c| &c.messages) {
        let content = message.content.to_lowercase();
        for (needle, count) in needles.iter().zip(counts.iter_mut()) {
            if content.contains(needle.as_str()) {
                *count += 1;
            }
        }
    }

    let mut themes: Vec<Theme> = needles
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > threshold)
        .map(|(keyword, frequency)| Theme { keyword, frequency })
        .collect();
    themes.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    themes.dedup_by(|a, b| a.keyword == b.keyword);
    themes
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub platform: String,
    pub conversations: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_conversations: usize,
    pub total_messages: usize,
    /// Sorted by conversation count, then platform name.
    pub platforms: Vec<PlatformStats>,
    /// Rounded to the nearest whole message; 0 for an empty corpus.
    pub average_messages_per_conversation: usize,
    /// Human messages that ask something (contain `?`).
    pub human_questions: usize,
}

pub fn corpus_stats(conversations: &[Conversation]) -> CorpusStats {
    let mut by_platform: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    let mut total_messages = 0;
    let mut human_questions = 0;

    for conv in conversations {
        let entry = by_platform.entry(conv.platform.as_str()).or_default();
        entry.0 += 1;
        entry.1 += conv.messages.len();
        total_messages += conv.messages.len();
        human_questions += conv
            .messages
            .iter()
            .filter(|m| m.role == Role::Human && m.content.contains('?'))
            .count();
    }

    let mut platforms: Vec<PlatformStats> = by_platform
        .into_iter()
        .map(|(platform, (conversations, messages))| PlatformStats {
            platform: platform.to_string(),
            conversations,
            messages,
        })
        .collect();
    platforms.sort_by(|a, b| {
        b.conversations
            .cmp(&a.conversations)
            .then_with(|| a.platform.cmp(&b.platform))
    });

    let total_conversations = conversations.len();
    let average_messages_per_conversation = if total_conversations == 0 {
        0
    } else {
        (total_messages + total_conversations / 2) / total_conversations
    };

    CorpusStats {
        total_conversations,
        total_messages,
        platforms,
        average_messages_per_conversation,
        human_questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use chrono::{TimeZone, Utc};
    use serde_json::Map;

    fn conv(id: &str, platform: &str, turns: &[(Role, &str)]) -> Conversation {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let messages = turns
            .iter()
            .enumerate()
            .map(|(i, (role, content))| Message {
                id: format!("{}-{}", id, i),
                timestamp: at,
                role: *role,
                content: content.to_string(),
                platform: platform.to_string(),
                metadata: Map::new(),
            })
            .collect();
        Conversation {
            id: id.to_string(),
            title: id.to_string(),
            platform: platform.to_string(),
            start_date: at,
            end_date: at,
            messages,
            metadata: Map::new(),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn themes_need_more_than_threshold() {
        let corpus = vec![
            conv("a", "Claude", &[(Role::Human, "Memory matters"), (Role::Assistant, "memory, MEMORY")]),
            conv("b", "ChatGPT", &[(Role::Human, "more memory"), (Role::Assistant, "growth")]),
        ];
        let themes = detect_themes(&corpus, &keywords(&["memory", "growth"]), 2);
        assert_eq!(
            themes,
            vec![Theme {
                keyword: "memory".to_string(),
                frequency: 3
            }]
        );
    }

    #[test]
    fn themes_sorted_by_frequency_then_keyword() {
        let corpus = vec![conv(
            "a",
            "Claude",
            &[
                (Role::Human, "pattern growth"),
                (Role::Human, "pattern growth"),
                (Role::Human, "pattern"),
            ],
        )];
        let themes = detect_themes(&corpus, &keywords(&["growth", "pattern"]), 0);
        let names: Vec<&str> = themes.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(names, vec!["pattern", "growth"]);
    }

    #[test]
    fn substring_matches_count() {
        // "ai" is found inside "maintain"
        let corpus = vec![conv("a", "Claude", &[(Role::Human, "maintain")])];
        let themes = detect_themes(&corpus, &keywords(&["AI"]), 0);
        assert_eq!(themes[0].keyword, "ai");
        assert_eq!(themes[0].frequency, 1);
    }

    #[test]
    fn stats_over_mixed_platforms() {
        let corpus = vec![
            conv("a", "Claude", &[(Role::Human, "why?"), (Role::Assistant, "because?")]),
            conv("b", "Claude", &[(Role::Human, "ok")]),
            conv("c", "ChatGPT", &[(Role::Human, "how?"), (Role::Assistant, "so"), (Role::Human, "hm")]),
        ];
        let stats = corpus_stats(&corpus);
        assert_eq!(stats.total_conversations, 3);
        assert_eq!(stats.total_messages, 6);
        assert_eq!(stats.average_messages_per_conversation, 2);
        assert_eq!(stats.human_questions, 2);
        assert_eq!(
            stats.platforms,
            vec![
                PlatformStats {
                    platform: "Claude".to_string(),
                    conversations: 2,
                    messages: 3
                },
                PlatformStats {
                    platform: "ChatGPT".to_string(),
                    conversations: 1,
                    messages: 3
                },
            ]
        );
    }

    #[test]
    fn empty_corpus_averages_to_zero() {
        let stats = corpus_stats(&[]);
        assert_eq!(stats.total_conversations, 0);
        assert_eq!(stats.average_messages_per_conversation, 0);
        assert!(stats.platforms.is_empty());
        assert!(detect_themes(&[], &keywords(DEFAULT_KEYWORDS), DEFAULT_THEME_THRESHOLD).is_empty());
    }
}

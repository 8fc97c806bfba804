//! Role-tagged transcript parsing.
//!
//! Plain-text and Markdown exports mark each turn with a line prefix such as
//! `Human:` or `**Assistant:**`. [`parse_transcript`] walks the text line by
//! line with a two-state machine (human turn / assistant turn) and an
//! accumulator:
//!
//! - a marker line flushes the accumulator under the *current* role, switches
//!   to the marker's role and seeds the accumulator with the rest of the line;
//! - any other line is appended to the accumulator;
//! - the final accumulator is flushed at end of input.
//!
//! Consecutive markers for the same role are kept as separate turns. Text
//! before the first marker belongs to the human side.

use crate::models::Role;

/// One recovered turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: Role,
    pub content: String,
}

/// Split a transcript into role-tagged turns.
pub fn parse_transcript(text: &str) -> Vec<TranscriptTurn> {
    let mut turns = Vec::new();
    let mut role = Role::Human;
    let mut buf = String::new();

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match match_marker(line) {
            Some((next_role, rest)) => {
                flush(&mut turns, role, &buf);
                role = next_role;
                buf.clear();
                buf.push_str(rest.trim());
            }
            None => {
                buf.push('\n');
                buf.push_str(line);
            }
        }
    }
    flush(&mut turns, role, &buf);

    turns
}

fn flush(turns: &mut Vec<TranscriptTurn>, role: Role, buf: &str) {
    let content = buf.trim();
    if !content.is_empty() {
        turns.push(TranscriptTurn {
            role,
            content: content.to_string(),
        });
    }
}

/// Recognize `Human:` / `Assistant:` at the start of a line, optionally
/// wrapped in up to two `*` on either side. Returns the role and the text
/// after the marker.
fn match_marker(line: &str) -> Option<(Role, &str)> {
    let rest = strip_stars(line);
    let (role, rest) = if let Some(r) = rest.strip_prefix("Human:") {
        (Role::Human, r)
    } else if let Some(r) = rest.strip_prefix("Assistant:") {
        (Role::Assistant, r)
    } else {
        return None;
    };
    Some((role, strip_stars(rest)))
}

fn strip_stars(s: &str) -> &str {
    let s = s.strip_prefix('*').unwrap_or(s);
    s.strip_prefix('*').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(turns: &[TranscriptTurn]) -> Vec<Role> {
        turns.iter().map(|t| t.role).collect()
    }

    fn contents(turns: &[TranscriptTurn]) -> Vec<&str> {
        turns.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn alternating_turns() {
        let turns = parse_transcript("Human: a\nAssistant: b\nHuman: c");
        assert_eq!(turns.len(), 3);
        assert_eq!(roles(&turns), vec![Role::Human, Role::Assistant, Role::Human]);
        assert_eq!(contents(&turns), vec!["a", "b", "c"]);
    }

    #[test]
    fn bold_markers_and_multiline_bodies() {
        let text = "**Human:** first line\nsecond line\n\n**Assistant:**\nanswer\n  indented\n";
        let turns = parse_transcript(text);
        assert_eq!(roles(&turns), vec![Role::Human, Role::Assistant]);
        assert_eq!(turns[0].content, "first line\nsecond line");
        assert_eq!(turns[1].content, "answer\n  indented");
    }

    #[test]
    fn consecutive_same_role_markers_are_kept() {
        let turns = parse_transcript("Human: one\nHuman: two\nAssistant: three");
        assert_eq!(roles(&turns), vec![Role::Human, Role::Human, Role::Assistant]);
        assert_eq!(contents(&turns), vec!["one", "two", "three"]);
    }

    #[test]
    fn preamble_is_a_human_turn() {
        let turns = parse_transcript("# My chat\n\nAssistant: hi");
        assert_eq!(roles(&turns), vec![Role::Human, Role::Assistant]);
        assert_eq!(turns[0].content, "# My chat");
    }

    #[test]
    fn empty_turns_are_skipped() {
        let turns = parse_transcript("Human:\nAssistant:   \nHuman: real");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "real");
    }

    #[test]
    fn crlf_line_endings() {
        let turns = parse_transcript("Human: a\r\nAssistant: b\r\n");
        assert_eq!(contents(&turns), vec!["a", "b"]);
    }

    #[test]
    fn marker_must_start_the_line() {
        let turns = parse_transcript("Human: quote\n  Assistant: not a marker");
        assert_eq!(turns.len(), 1);
        assert!(turns[0].content.contains("Assistant: not a marker"));
    }

    #[test]
    fn empty_input() {
        assert!(parse_transcript("").is_empty());
        assert!(parse_transcript("\n\n  \n").is_empty());
    }
}

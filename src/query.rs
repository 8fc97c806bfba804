//! Corpus filtering.
//!
//! A [`QueryFilter`] combines three independent predicates with AND: free
//! text (case-insensitive substring of the title or any message), platform
//! (case-insensitive exact match, `"all"` matches everything) and a date
//! range that must contain the conversation's whole `[startDate, endDate]`
//! span. An absent predicate always matches.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::Conversation;

/// Inclusive instant range. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whole-day range: `since` from its first instant, `until` through its
    /// last.
    pub fn from_days(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self {
            start: since
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
            end: until
                .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
                .map(|dt| dt.and_utc()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains_span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let after_start = self.start.map_or(true, |bound| start >= bound);
        let before_end = self.end.map_or(true, |bound| end <= bound);
        after_start && before_end
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub text: Option<String>,
    pub platform: Option<String>,
    pub date_range: DateRange,
}

impl QueryFilter {
    pub fn matches(&self, conv: &Conversation) -> bool {
        self.matches_text(conv) && self.matches_platform(conv) && self.matches_dates(conv)
    }

    /// The matching conversations, in corpus order.
    pub fn apply<'a>(&self, conversations: &'a [Conversation]) -> Vec<&'a Conversation> {
        conversations.iter().filter(|c| self.matches(c)).collect()
    }

    fn matches_text(&self, conv: &Conversation) -> bool {
        let Some(needle) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        conv.title.to_lowercase().contains(&needle)
            || conv
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(&needle))
    }

    fn matches_platform(&self, conv: &Conversation) -> bool {
        match self.platform.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(p) if p.eq_ignore_ascii_case("all") => true,
            Some(p) => conv.platform.to_lowercase() == p.to_lowercase(),
        }
    }

    fn matches_dates(&self, conv: &Conversation) -> bool {
        self.date_range.contains_span(conv.start_date, conv.end_date)
    }
}

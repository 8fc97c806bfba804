use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::config::Config;
use crate::ingest::{load_corpus, note_failures, LoadRequest};
use crate::models::Conversation;
use crate::query::{DateRange, QueryFilter};

const EXCERPT_CHARS: usize = 160;

pub async fn run_search(
    config: &Config,
    request: &LoadRequest,
    query: &str,
    platform: Option<String>,
    since: Option<String>,
    until: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = QueryFilter {
        text: Some(query.to_string()),
        platform,
        date_range: DateRange::from_days(
            parse_day(since.as_deref())?,
            parse_day(until.as_deref())?,
        ),
    };

    let report = load_corpus(config, request).await?;
    note_failures(&report);

    let mut results = filter.apply(&report.conversations);
    if let Some(lim) = limit {
        results.truncate(lim);
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, conv) in results.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, conv.platform, conv.title);
        println!(
            "    dates: {} .. {}",
            conv.start_date.format("%Y-%m-%d"),
            conv.end_date.format("%Y-%m-%d")
        );
        println!("    messages: {}", conv.messages.len());
        if let Some(excerpt) = excerpt(conv, query) {
            println!("    excerpt: \"{}\"", excerpt);
        }
        println!("    id: {}", conv.id);
        println!();
    }

    Ok(())
}

fn parse_day(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
        })
        .transpose()
}

/// First message mentioning `query` (or the first message), on one line.
fn excerpt(conv: &Conversation, query: &str) -> Option<String> {
    let needle = query.trim().to_lowercase();
    let message = conv
        .messages
        .iter()
        .find(|m| !needle.is_empty() && m.content.to_lowercase().contains(&needle))
        .or_else(|| conv.messages.first())?;

    let flat = message.content.replace('\n', " ");
    let flat = flat.trim();
    let mut out: String = flat.chars().take(EXCERPT_CHARS).collect();
    if flat.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    Some(out)
}

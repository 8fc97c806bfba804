//! Corpus overview commands.
//!
//! `convo stats` gives a quick summary of what was loaded: totals,
//! per-platform breakdown and the inquiry count. `convo themes` lists the
//! keywords that recur across message content.

use anyhow::Result;

use crate::analytics::{corpus_stats, detect_themes};
use crate::config::Config;
use crate::ingest::{load_corpus, note_failures, LoadRequest};

pub async fn run_stats(config: &Config, request: &LoadRequest) -> Result<()> {
    let report = load_corpus(config, request).await?;
    note_failures(&report);
    let stats = corpus_stats(&report.conversations);

    println!("Conversation Corpus Stats");
    println!("=========================");
    println!();
    println!("  Sources:        {}", report.sources_found);
    println!("  Failed:         {}", report.failures.len());
    println!();
    println!("  Conversations:  {}", stats.total_conversations);
    println!("  Messages:       {}", stats.total_messages);
    println!("  Avg per conv:   {}", stats.average_messages_per_conversation);
    println!("  Questions:      {}", stats.human_questions);

    if !stats.platforms.is_empty() {
        println!();
        println!("  By platform:");
        println!("  {:<24} {:>8} {:>10}", "PLATFORM", "CONVS", "MESSAGES");
        println!("  {}", "-".repeat(44));
        for p in &stats.platforms {
            println!(
                "  {:<24} {:>8} {:>10}",
                p.platform, p.conversations, p.messages
            );
        }
    }

    println!();
    Ok(())
}

pub async fn run_themes(
    config: &Config,
    request: &LoadRequest,
    keywords: Vec<String>,
    threshold: Option<usize>,
) -> Result<()> {
    let keywords = if keywords.is_empty() {
        config.themes.keywords.clone()
    } else {
        keywords
    };
    let threshold = threshold.unwrap_or(config.themes.threshold);

    let report = load_corpus(config, request).await?;
    note_failures(&report);
    let themes = detect_themes(&report.conversations, &keywords, threshold);

    if themes.is_empty() {
        println!("No themes above threshold {}.", threshold);
        return Ok(());
    }

    println!("  {:<24} {:>10}", "THEME", "MESSAGES");
    println!("  {}", "-".repeat(36));
    for theme in &themes {
        println!("  {:<24} {:>10}", theme.keyword, theme.frequency);
    }
    Ok(())
}

use std::sync::Arc;

use super::{find_user, open_store};
use crate::config::Config;
use crate::db::HistoryQuery;
use crate::scheduler::Scheduler;
use crate::services::HistoryService;

pub async fn cmd_history(config: &Config, email: &str, limit: u64) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let user = find_user(&store, email).await?;
    let history = HistoryService::new(store, config.history.default_limit);

    let entries = history
        .history(
            user.id,
            HistoryQuery {
                limit,
                ..HistoryQuery::default()
            },
        )
        .await?;

    if entries.is_empty() {
        println!("No activity recorded for {}.", user.username);
        return Ok(());
    }

    println!("Recent activity for {} (last {}):", user.username, entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        println!("• {} - {}", entry.action_type, entry.description);
        println!("  {}", entry.created_at);
    }

    Ok(())
}

pub async fn cmd_stats(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let user = find_user(&store, email).await?;
    let history = HistoryService::new(store, config.history.default_limit);

    let summary = history.usage_summary(user.id).await?;
    let counts = history.statistics(user.id).await?;

    println!("Usage for {}", user.username);
    println!("{:-<40}", "");
    println!("Sequences:        {}", summary.total_sequences);
    println!("Analyzed:         {}", summary.completed_sequences);
    println!("Completion rate:  {:.1}%", summary.completion_rate);
    println!("Activities:       {}", summary.total_activities);

    if !counts.is_empty() {
        println!();
        for count in counts {
            println!("  {:<28} {:>6}", count.action_type, count.count);
        }
    }

    Ok(())
}

pub async fn cmd_prune_history(config: &Config, days: Option<i64>) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let history = Arc::new(HistoryService::new(store, config.history.default_limit));

    let removed = match days {
        Some(days) => history.prune(days).await?,
        None => {
            Scheduler::new(history, config.history.clone())
                .run_once()
                .await?
        }
    };
    let days = days.unwrap_or(config.history.retention_days);
    println!("✓ Removed {removed} activity entries older than {days} days");
    Ok(())
}

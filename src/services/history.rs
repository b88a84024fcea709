use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::db::{ActionCount, ActivityEntry, HistoryQuery, SequenceQuery, SequenceRecord, Store};
use crate::domain::{SequenceStatus, UserId};

/// Most recent sequences considered by the usage summary.
const SUMMARY_WINDOW: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_sequences: usize,
    pub completed_sequences: usize,
    pub total_activities: u64,
    /// Percentage of sequences with finished analysis, one decimal.
    pub completion_rate: f64,
}

/// Activity history, statistics and retention.
#[derive(Clone)]
pub struct HistoryService {
    store: Store,
    default_limit: u64,
}

impl HistoryService {
    #[must_use]
    pub const fn new(store: Store, default_limit: u64) -> Self {
        Self {
            store,
            default_limit,
        }
    }

    pub async fn history(&self, user_id: UserId, mut query: HistoryQuery) -> Result<Vec<ActivityEntry>> {
        if query.limit == 0 {
            query.limit = self.default_limit;
        }
        check_range(query.start_date, query.end_date)?;
        self.store.get_history(user_id, &query).await
    }

    pub async fn statistics(&self, user_id: UserId) -> Result<Vec<ActionCount>> {
        self.store.activity_statistics(user_id).await
    }

    pub async fn delete_entry(&self, user_id: UserId, entry_id: i64) -> Result<bool> {
        self.store.delete_history_entry(entry_id, user_id).await
    }

    pub async fn usage_summary(&self, user_id: UserId) -> Result<UsageSummary> {
        let sequences = self
            .store
            .list_user_sequences(
                user_id,
                &SequenceQuery {
                    limit: Some(SUMMARY_WINDOW),
                    ..Default::default()
                },
            )
            .await?;

        let completed = sequences.iter().filter(|s| s.status.is_finished()).count();
        let total_activities = self.store.count_activities(user_id).await?;

        Ok(UsageSummary {
            total_sequences: sequences.len(),
            completed_sequences: completed,
            total_activities,
            completion_rate: completion_rate(completed, sequences.len()),
        })
    }

    /// Finished sequences created within `[start, end]`.
    pub async fn analyzed_sequences(
        &self,
        user_id: UserId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<SequenceRecord>> {
        check_range(start, end)?;
        self.store
            .list_user_sequences(
                user_id,
                &SequenceQuery {
                    limit: None,
                    statuses: vec![SequenceStatus::Analyzed, SequenceStatus::Completed],
                    start_date: start,
                    end_date: end,
                },
            )
            .await
    }

    /// Drop activity entries older than `days`.
    pub async fn prune(&self, days: i64) -> Result<u64> {
        if days < 1 {
            bail!("Retention must be at least one day, got {days}");
        }
        let removed = self.store.prune_history(days).await?;
        info!(event = "history_pruned", removed, days, "Pruned activity history");
        Ok(removed)
    }
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            bail!("End date {end} is before start date {start}");
        }
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::domain::ActionType;
    use serde_json::json;

    #[test]
    fn test_completion_rate() {
        assert!((completion_rate(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((completion_rate(1, 3) - 33.3).abs() < 1e-9);
        assert!((completion_rate(2, 3) - 66.7).abs() < 1e-9);
        assert!((completion_rate(4, 4) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_check_range() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
        assert!(check_range(Some(d(1)), Some(d(2))).is_ok());
        assert!(check_range(Some(d(2)), Some(d(2))).is_ok());
        assert!(check_range(Some(d(3)), Some(d(2))).is_err());
        assert!(check_range(None, Some(d(2))).is_ok());
    }

    #[tokio::test]
    async fn test_usage_summary() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..Default::default()
        };
        let user = store
            .create_user("dana", "dana@example.org", "pw12!x", &security)
            .await
            .unwrap();

        for name in ["a", "b", "c"] {
            store
                .create_sequence(user.id, name, ">input_sequence\nACGT\n", &json!({}))
                .await
                .unwrap();
        }
        let sequences = store
            .list_user_sequences(user.id, &SequenceQuery::default())
            .await
            .unwrap();
        store
            .promote_sequence_status(sequences[0].id, SequenceStatus::Analyzed)
            .await
            .unwrap();
        store
            .log_activity(user.id, ActionType::SequenceUpload, "upload")
            .await;

        let service = HistoryService::new(store, 20);
        let summary = service.usage_summary(user.id).await.unwrap();
        assert_eq!(summary.total_sequences, 3);
        assert_eq!(summary.completed_sequences, 1);
        assert_eq!(summary.total_activities, 1);
        assert!((summary.completion_rate - 33.3).abs() < 1e-9);

        let analyzed = service.analyzed_sequences(user.id, None, None).await.unwrap();
        assert_eq!(analyzed.len(), 1);

        assert!(service.prune(0).await.is_err());
        assert!(service.prune(1_000_000_000_000_000).await.is_err());
        assert_eq!(service.prune(30).await.unwrap(), 0);
    }
}

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use serde::Serialize;

use super::{day_end_exclusive, day_start, now_timestamp, timestamp_days_ago};
use crate::domain::UserId;
use crate::entities::{activity_log, prelude::*};

pub type ActivityEntry = activity_log::Model;

/// Filters for a user's activity history. Results are newest first.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Empty means every action type.
    pub action_types: Vec<String>,
    /// Case-insensitive match against action type or description.
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: u64,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            action_types: Vec::new(),
            search: None,
            start_date: None,
            end_date: None,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCount {
    pub action_type: String,
    pub count: i64,
}

pub struct ActivityRepository {
    conn: DatabaseConnection,
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, user_id: UserId, action_type: &str, description: &str) -> Result<()> {
        let active_model = activity_log::ActiveModel {
            user_id: Set(user_id.value()),
            action_type: Set(action_type.to_string()),
            description: Set(description.to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        ActivityLog::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert activity entry")?;
        Ok(())
    }

    pub async fn history(&self, user_id: UserId, query: &HistoryQuery) -> Result<Vec<ActivityEntry>> {
        let mut select = ActivityLog::find()
            .filter(activity_log::Column::UserId.eq(user_id.value()))
            .order_by_desc(activity_log::Column::CreatedAt)
            .order_by_desc(activity_log::Column::Id);

        if !query.action_types.is_empty() {
            select = select.filter(activity_log::Column::ActionType.is_in(query.action_types.clone()));
        }

        // SQLite LIKE is case-insensitive for ASCII
        if let Some(text) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(activity_log::Column::ActionType.contains(text))
                    .add(activity_log::Column::Description.contains(text)),
            );
        }

        if let Some(start) = query.start_date {
            select = select.filter(activity_log::Column::CreatedAt.gte(day_start(start)));
        }

        if let Some(end) = query.end_date {
            select = select.filter(activity_log::Column::CreatedAt.lt(day_end_exclusive(end)));
        }

        let items = select
            .limit(query.limit)
            .all(&self.conn)
            .await
            .context("Failed to query activity history")?;
        Ok(items)
    }

    pub async fn count_for_user(&self, user_id: UserId) -> Result<u64> {
        let count = ActivityLog::find()
            .filter(activity_log::Column::UserId.eq(user_id.value()))
            .count(&self.conn)
            .await
            .context("Failed to count activity entries")?;
        Ok(count)
    }

    /// Delete one entry, only if it belongs to `user_id`.
    pub async fn delete_entry(&self, id: i64, user_id: UserId) -> Result<bool> {
        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::Id.eq(id))
            .filter(activity_log::Column::UserId.eq(user_id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to delete activity entry")?;
        Ok(result.rows_affected > 0)
    }

    /// Entry counts per action type, most frequent first.
    pub async fn statistics(&self, user_id: UserId) -> Result<Vec<ActionCount>> {
        let rows: Vec<(String, i64)> = ActivityLog::find()
            .select_only()
            .column(activity_log::Column::ActionType)
            .column_as(Expr::col(activity_log::Column::Id).count(), "count")
            .filter(activity_log::Column::UserId.eq(user_id.value()))
            .group_by(activity_log::Column::ActionType)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate activity entries")?;

        let mut counts: Vec<ActionCount> = rows
            .into_iter()
            .map(|(action_type, count)| ActionCount { action_type, count })
            .collect();
        counts.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.action_type.cmp(&b.action_type))
        });
        Ok(counts)
    }

    pub async fn prune(&self, older_than_days: i64) -> Result<u64> {
        let Some(cutoff) = timestamp_days_ago(older_than_days) else {
            bail!("Retention of {older_than_days} days is out of range");
        };
        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::CreatedAt.lt(cutoff))
            .exec(&self.conn)
            .await
            .context("Failed to prune activity history")?;

        Ok(result.rows_affected)
    }
}

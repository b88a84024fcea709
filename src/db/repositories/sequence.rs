use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{day_end_exclusive, day_start, now_timestamp};
use crate::domain::{SequenceId, SequenceStatus, UserId};
use crate::entities::{analysis_results, reports, sequences};

#[derive(Debug, Clone, Serialize)]
pub struct SequenceRecord {
    pub id: SequenceId,
    pub user_id: UserId,
    pub name: String,
    pub content: String,
    pub metadata: Value,
    pub status: SequenceStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<sequences::Model> for SequenceRecord {
    type Error = anyhow::Error;

    fn try_from(model: sequences::Model) -> Result<Self> {
        let status = model
            .status
            .parse()
            .with_context(|| format!("Sequence {} has an invalid status", model.id))?;
        let metadata = serde_json::from_str(&model.metadata)
            .with_context(|| format!("Sequence {} has invalid metadata", model.id))?;

        Ok(Self {
            id: SequenceId::new(model.id),
            user_id: UserId::new(model.user_id),
            name: model.name,
            content: model.content,
            metadata,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Filters for listing a user's sequences. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct SequenceQuery {
    pub limit: Option<u64>,
    /// Empty means any status.
    pub statuses: Vec<SequenceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Outcome of a status promotion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Promoted { from: SequenceStatus },
    /// The target was not ahead of the current status.
    Unchanged { current: SequenceStatus },
    Missing,
}

pub struct SequenceRepository {
    conn: DatabaseConnection,
}

impl SequenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: UserId,
        name: &str,
        content: &str,
        metadata: &Value,
    ) -> Result<SequenceRecord> {
        let now = now_timestamp();
        let active = sequences::ActiveModel {
            user_id: Set(user_id.value()),
            name: Set(name.to_string()),
            content: Set(content.to_string()),
            metadata: Set(metadata.to_string()),
            status: Set(SequenceStatus::Created.to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert sequence")?;

        SequenceRecord::try_from(model)
    }

    pub async fn get(&self, id: SequenceId) -> Result<Option<SequenceRecord>> {
        sequences::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query sequence")?
            .map(SequenceRecord::try_from)
            .transpose()
    }

    /// Like [`get`](Self::get) but only returns sequences owned by `user_id`.
    pub async fn get_owned(
        &self,
        id: SequenceId,
        user_id: UserId,
    ) -> Result<Option<SequenceRecord>> {
        sequences::Entity::find_by_id(id.value())
            .filter(sequences::Column::UserId.eq(user_id.value()))
            .one(&self.conn)
            .await
            .context("Failed to query sequence")?
            .map(SequenceRecord::try_from)
            .transpose()
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
        query: &SequenceQuery,
    ) -> Result<Vec<SequenceRecord>> {
        let mut select = sequences::Entity::find()
            .filter(sequences::Column::UserId.eq(user_id.value()))
            .order_by_desc(sequences::Column::CreatedAt)
            .order_by_desc(sequences::Column::Id);

        if !query.statuses.is_empty() {
            let statuses: Vec<String> = query.statuses.iter().map(ToString::to_string).collect();
            select = select.filter(sequences::Column::Status.is_in(statuses));
        }

        if let Some(start) = query.start_date {
            select = select.filter(sequences::Column::CreatedAt.gte(day_start(start)));
        }

        if let Some(end) = query.end_date {
            select = select.filter(sequences::Column::CreatedAt.lt(day_end_exclusive(end)));
        }

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        select
            .all(&self.conn)
            .await
            .context("Failed to list sequences")?
            .into_iter()
            .map(SequenceRecord::try_from)
            .collect()
    }

    /// Shallow-merge `patch` into the stored metadata object.
    pub async fn merge_metadata(&self, id: SequenceId, patch: &Map<String, Value>) -> Result<bool> {
        let Some(model) = sequences::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query sequence for metadata update")?
        else {
            return Ok(false);
        };

        let mut metadata: Map<String, Value> =
            serde_json::from_str(&model.metadata).unwrap_or_default();
        for (key, value) in patch {
            metadata.insert(key.clone(), value.clone());
        }

        let mut active: sequences::ActiveModel = model.into();
        active.metadata = Set(Value::Object(metadata).to_string());
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Move the status forward. Requests that would move it backward, or keep
    /// it where it is, leave the row untouched.
    pub async fn promote_status(
        &self,
        id: SequenceId,
        next: SequenceStatus,
    ) -> Result<StatusChange> {
        let Some(model) = sequences::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query sequence for status update")?
        else {
            return Ok(StatusChange::Missing);
        };

        let current: SequenceStatus = model
            .status
            .parse()
            .with_context(|| format!("Sequence {} has an invalid status", model.id))?;

        if !current.can_promote_to(next) {
            return Ok(StatusChange::Unchanged { current });
        }

        let mut active: sequences::ActiveModel = model.into();
        active.status = Set(next.to_string());
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(StatusChange::Promoted { from: current })
    }

    /// Drop every derived record and put the sequence back to `created`.
    pub async fn reset(&self, id: SequenceId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(model) = sequences::Entity::find_by_id(id.value())
            .one(&txn)
            .await
            .context("Failed to query sequence for reset")?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        analysis_results::Entity::delete_many()
            .filter(analysis_results::Column::SequenceId.eq(id.value()))
            .exec(&txn)
            .await?;

        reports::Entity::delete_many()
            .filter(reports::Column::SequenceId.eq(id.value()))
            .exec(&txn)
            .await?;

        let mut active: sequences::ActiveModel = model.into();
        active.status = Set(SequenceStatus::Created.to_string());
        active.updated_at = Set(now_timestamp());
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Delete a sequence owned by `user_id` together with its results and
    /// reports. Children go first, all inside one transaction.
    pub async fn delete_cascade(&self, id: SequenceId, user_id: UserId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let owned = sequences::Entity::find()
            .filter(
                Condition::all()
                    .add(sequences::Column::Id.eq(id.value()))
                    .add(sequences::Column::UserId.eq(user_id.value())),
            )
            .one(&txn)
            .await
            .context("Failed to query sequence for deletion")?;

        if owned.is_none() {
            txn.rollback().await?;
            return Ok(false);
        }

        analysis_results::Entity::delete_many()
            .filter(analysis_results::Column::SequenceId.eq(id.value()))
            .exec(&txn)
            .await?;

        reports::Entity::delete_many()
            .filter(reports::Column::SequenceId.eq(id.value()))
            .exec(&txn)
            .await?;

        let result = sequences::Entity::delete_by_id(id.value())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

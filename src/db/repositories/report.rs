use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use serde_json::Value;

use super::now_timestamp;
use crate::domain::{SequenceId, UserId};
use crate::entities::reports;

pub const STANDARD_REPORT: &str = "standard";

#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub id: i32,
    pub sequence_id: SequenceId,
    pub user_id: UserId,
    pub report_type: String,
    pub content: Value,
    pub created_at: String,
}

impl TryFrom<reports::Model> for ReportRecord {
    type Error = anyhow::Error;

    fn try_from(model: reports::Model) -> Result<Self> {
        let content = serde_json::from_str(&model.content)
            .with_context(|| format!("Report {} has an invalid descriptor", model.id))?;

        Ok(Self {
            id: model.id,
            sequence_id: SequenceId::new(model.sequence_id),
            user_id: UserId::new(model.user_id),
            report_type: model.report_type,
            content,
            created_at: model.created_at,
        })
    }
}

pub struct ReportRepository {
    conn: DatabaseConnection,
}

impl ReportRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        sequence_id: SequenceId,
        user_id: UserId,
        report_type: &str,
        content: &Value,
    ) -> Result<ReportRecord> {
        let active = reports::ActiveModel {
            sequence_id: Set(sequence_id.value()),
            user_id: Set(user_id.value()),
            report_type: Set(report_type.to_string()),
            content: Set(content.to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert report")?;

        ReportRecord::try_from(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<ReportRecord>> {
        reports::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query report")?
            .map(ReportRecord::try_from)
            .transpose()
    }

    pub async fn list(&self, sequence_id: SequenceId) -> Result<Vec<ReportRecord>> {
        reports::Entity::find()
            .filter(reports::Column::SequenceId.eq(sequence_id.value()))
            .order_by_desc(reports::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list reports")?
            .into_iter()
            .map(ReportRecord::try_from)
            .collect()
    }
}

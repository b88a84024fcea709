use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use serde_json::Value;

use super::now_timestamp;
use crate::domain::{ResultKind, SequenceId, UserId};
use crate::entities::analysis_results;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub id: i32,
    pub sequence_id: SequenceId,
    pub user_id: UserId,
    pub kind: ResultKind,
    pub data: Value,
    pub created_at: String,
}

impl TryFrom<analysis_results::Model> for AnalysisResult {
    type Error = anyhow::Error;

    fn try_from(model: analysis_results::Model) -> Result<Self> {
        let kind = model
            .result_type
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Result {}: {e}", model.id))?;
        let data = serde_json::from_str(&model.data)
            .with_context(|| format!("Result {} has an invalid payload", model.id))?;

        Ok(Self {
            id: model.id,
            sequence_id: SequenceId::new(model.sequence_id),
            user_id: UserId::new(model.user_id),
            kind,
            data,
            created_at: model.created_at,
        })
    }
}

/// Analysis results are append-only: there is no update path.
pub struct ResultRepository {
    conn: DatabaseConnection,
}

impl ResultRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        sequence_id: SequenceId,
        user_id: UserId,
        kind: ResultKind,
        data: &Value,
    ) -> Result<AnalysisResult> {
        let active = analysis_results::ActiveModel {
            sequence_id: Set(sequence_id.value()),
            user_id: Set(user_id.value()),
            result_type: Set(kind.as_str().to_string()),
            data: Set(data.to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert analysis result")?;

        AnalysisResult::try_from(model)
    }

    pub async fn list(&self, sequence_id: SequenceId) -> Result<Vec<AnalysisResult>> {
        analysis_results::Entity::find()
            .filter(analysis_results::Column::SequenceId.eq(sequence_id.value()))
            .order_by_asc(analysis_results::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list analysis results")?
            .into_iter()
            .map(AnalysisResult::try_from)
            .collect()
    }

    pub async fn latest(
        &self,
        sequence_id: SequenceId,
        kind: ResultKind,
    ) -> Result<Option<AnalysisResult>> {
        analysis_results::Entity::find()
            .filter(analysis_results::Column::SequenceId.eq(sequence_id.value()))
            .filter(analysis_results::Column::ResultType.eq(kind.as_str()))
            .order_by_desc(analysis_results::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query analysis result")?
            .map(AnalysisResult::try_from)
            .transpose()
    }
}

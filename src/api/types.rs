use serde::Serialize;
use serde_json::Value;

use crate::db::SequenceRecord;
use crate::domain::{SequenceId, SequenceStatus};
use crate::pipeline::{PipelineSession, Step};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepDto {
    pub index: u8,
    pub title: &'static str,
    pub completed: bool,
}

/// What the dashboard needs to draw the step indicator.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub current_step: u8,
    pub current_title: &'static str,
    pub steps: Vec<StepDto>,
    pub completed_steps: Vec<Step>,
    pub sequence_id: Option<SequenceId>,
    pub can_advance: bool,
    pub final_results_saved: bool,
    pub report_id: Option<i32>,
}

impl From<&PipelineSession> for SessionView {
    fn from(session: &PipelineSession) -> Self {
        let current = session.current_step();
        Self {
            current_step: current.index(),
            current_title: current.title(),
            steps: Step::ALL
                .iter()
                .map(|step| StepDto {
                    index: step.index(),
                    title: step.title(),
                    completed: session.is_complete(*step),
                })
                .collect(),
            completed_steps: session.completed_steps(),
            sequence_id: session.sequence_id(),
            can_advance: session.can_advance()
                && (current != Step::Upload || session.sequence_id().is_some()),
            final_results_saved: session.final_results_saved(),
            report_id: session.report_id(),
        }
    }
}

/// Sequence listing entry without the sequence content.
#[derive(Debug, Serialize)]
pub struct SequenceSummaryDto {
    pub id: SequenceId,
    pub name: String,
    pub status: SequenceStatus,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SequenceRecord> for SequenceSummaryDto {
    fn from(record: SequenceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            status: record.status,
            metadata: record.metadata,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

//! Domain service for analysis runs.
//!
//! Drives a [`PipelineSession`] through upload, the four tool steps, the
//! final summary and the report, persisting every outcome. The session is
//! owned by the caller and passed in by reference.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::db::{AnalysisResult, ReportRecord, SequenceQuery, SequenceRecord};
use crate::domain::{SequenceId, UserId};
use crate::parser::annotation::GoTerm;
use crate::parser::pdb::ModelStats;
use crate::pipeline::{PipelineError, PipelineSession, Step};
use crate::report::AnalysisSummary;

/// Errors specific to analysis operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Step(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AnalysisError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadSource {
    File,
    #[default]
    Text,
}

impl fmt::Display for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Text => "text",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    /// Display name. Defaults to the file name or a timestamped label.
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub source: UploadSource,
}

/// Outcome of running the current step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRun {
    pub step: Step,
    pub title: &'static str,
    pub message: String,
    /// False when the step had been completed before and was run again.
    pub newly_completed: bool,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub protein_id: String,
    pub file_name: String,
    #[serde(flatten)]
    pub stats: ModelStats,
}

/// A rendered report ready for download.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub content_type: String,
    pub body: String,
}

/// Domain service trait for analysis runs.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    /// Normalizes and stores an uploaded sequence and attaches a fresh
    /// session to it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Validation`] for an empty sequence or one
    /// outside the nucleotide alphabet.
    async fn upload(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        request: UploadRequest,
    ) -> Result<SequenceRecord, AnalysisError>;

    /// Runs the session's current step and records it complete.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Step`] with the tool diagnostic when the step
    /// fails. The step is then not marked complete.
    async fn run_step(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<StepRun, AnalysisError>;

    /// Records `step` complete. Returns true only for a new entry; only then
    /// are status and activity log written.
    async fn mark_complete(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        step: Step,
    ) -> Result<bool, AnalysisError>;

    /// Next step, or the final step unchanged when already there. Fails
    /// while no sequence is attached or the current step is incomplete.
    fn advance(&self, session: &mut PipelineSession) -> Result<Step, AnalysisError>;

    /// Previous step; a no-op at upload.
    fn retreat(&self, session: &mut PipelineSession) -> Result<Step, AnalysisError>;

    /// Back to upload: derived artifacts, results and reports are removed
    /// and the sequence status returns to `created`.
    async fn reset(&self, user_id: UserId, session: &mut PipelineSession)
    -> Result<(), AnalysisError>;

    /// Rebuilds the session of a persisted sequence.
    async fn resume(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        sequence_id: SequenceId,
    ) -> Result<(), AnalysisError>;

    /// Aggregates the run and persists the summary once.
    async fn final_results(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<AnalysisSummary, AnalysisError>;

    async fn generate_report(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<ReportRecord, AnalysisError>;

    async fn download_report(
        &self,
        user_id: UserId,
        report_id: i32,
    ) -> Result<RenderedReport, AnalysisError>;

    async fn annotation_terms(
        &self,
        session: &PipelineSession,
        gene_id: &str,
        threshold: f64,
    ) -> Result<Vec<GoTerm>, AnalysisError>;

    async fn structure_models(
        &self,
        session: &PipelineSession,
    ) -> Result<Vec<ModelInfo>, AnalysisError>;

    async fn list_sequences(
        &self,
        user_id: UserId,
        query: &SequenceQuery,
    ) -> Result<Vec<SequenceRecord>, AnalysisError>;

    async fn get_sequence(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<SequenceRecord, AnalysisError>;

    async fn sequence_results(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<Vec<AnalysisResult>, AnalysisError>;

    async fn sequence_reports(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<Vec<ReportRecord>, AnalysisError>;

    /// Removes the sequence with its results, reports and artifacts.
    async fn delete_sequence(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<(), AnalysisError>;
}

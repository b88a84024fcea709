//! `SeaORM` implementation of the `AnalysisService` trait.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{
    AnalysisResult, ReportRecord, STANDARD_REPORT, SequenceQuery, SequenceRecord, Store,
};
use crate::domain::{ActionType, ResultKind, SequenceId, SequenceStatus, UserId};
use crate::parser::annotation::{self, GoTerm};
use crate::parser::fasta::normalize_upload;
use crate::parser::pdb::model_stats;
use crate::pipeline::artifacts::read_optional;
use crate::pipeline::{ArtifactKind, ArtifactStore, PipelineError, PipelineSession, Step, StepExecutor};
use crate::report::{
    AnalysisSummary, ReportBuilder, ReportContext, ReportRenderer, ResultAggregator,
};
use crate::services::analysis_service::{
    AnalysisError, AnalysisService, ModelInfo, RenderedReport, StepRun, UploadRequest,
};

pub struct SeaOrmAnalysisService {
    store: Store,
    executor: Arc<StepExecutor>,
    aggregator: ResultAggregator,
    builder: ReportBuilder,
    renderer: Arc<dyn ReportRenderer>,
}

impl SeaOrmAnalysisService {
    #[must_use]
    pub fn new(store: Store, executor: Arc<StepExecutor>, renderer: Arc<dyn ReportRenderer>) -> Self {
        let aggregator = ResultAggregator::new(executor.artifacts().clone());
        Self {
            store,
            executor,
            aggregator,
            builder: ReportBuilder,
            renderer,
        }
    }

    fn artifacts(&self) -> &ArtifactStore {
        self.executor.artifacts()
    }

    async fn owned_sequence(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<SequenceRecord, AnalysisError> {
        self.store
            .get_user_sequence(sequence_id, user_id)
            .await?
            .ok_or_else(|| AnalysisError::NotFound(format!("Sequence {sequence_id}")))
    }

    /// The session's sequence, checked against the user.
    async fn attached(
        &self,
        user_id: UserId,
        session: &PipelineSession,
    ) -> Result<SequenceId, AnalysisError> {
        let id = Self::attached_id(session)?;
        self.owned_sequence(user_id, id).await?;
        Ok(id)
    }

    fn attached_id(session: &PipelineSession) -> Result<SequenceId, AnalysisError> {
        session
            .sequence_id()
            .ok_or_else(|| AnalysisError::Validation("Upload a sequence first".to_string()))
    }

    async fn promote(&self, id: SequenceId, status: SequenceStatus) -> Result<(), AnalysisError> {
        self.store.promote_sequence_status(id, status).await?;
        Ok(())
    }

    async fn build_report(
        &self,
        user_id: UserId,
        run: SequenceId,
    ) -> Result<ReportRecord, AnalysisError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AnalysisError::NotFound(format!("User {user_id}")))?;

        let (contents, summary) = self.aggregator.summarize_run(run).await;
        let mut context = ReportContext::new(
            user.username,
            run,
            Utc::now(),
            self.renderer.extension(),
        );
        let path = self
            .artifacts()
            .reserve_report(run, &context.file_name)
            .await?;
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            context.file_name = name.to_string();
        }

        let document = self.builder.build(&context, &contents, &summary);
        let body = self.renderer.render(&document);
        self.artifacts()
            .write_report(run, &document.file_name, &body)
            .await?;

        let descriptor = json!({
            "path": path.to_string_lossy(),
            "format": self.renderer.extension(),
            "file_name": document.file_name,
            "page_count": document.page_count(),
        });

        match self
            .store
            .add_report(run, user_id, STANDARD_REPORT, &descriptor)
            .await
        {
            Ok(record) => Ok(record),
            Err(e) => {
                tokio::fs::remove_file(&path).await.ok();
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl AnalysisService for SeaOrmAnalysisService {
    async fn upload(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        request: UploadRequest,
    ) -> Result<SequenceRecord, AnalysisError> {
        let normalized = normalize_upload(&request.content)
            .map_err(|e| AnalysisError::Validation(e.to_string()))?;

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(
                || format!("Sequence {}", Utc::now().format("%Y-%m-%d %H:%M")),
                str::to_string,
            );

        let length = normalized.record.len();
        let metadata = json!({
            "sequence_name": name,
            "length": length,
            "source": request.source.to_string(),
            "record_count": normalized.record_count,
        });

        let record = self
            .store
            .create_sequence(user_id, &name, &normalized.fasta, &metadata)
            .await?;

        self.artifacts()
            .write(record.id, ArtifactKind::InputFasta, &normalized.fasta)
            .await?;

        self.store
            .log_activity(
                user_id,
                ActionType::SequenceUpload,
                &format!("Uploaded sequence '{name}' ({length} bp)"),
            )
            .await;
        info!(
            event = "sequence_uploaded",
            sequence_id = record.id.value(),
            length,
            "Sequence uploaded"
        );

        *session = PipelineSession::for_sequence(record.id);
        Ok(record)
    }

    async fn run_step(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<StepRun, AnalysisError> {
        let run = self.attached(user_id, session).await?;
        let step = session.current_step();
        if !step.is_executable() {
            return Err(AnalysisError::Validation(format!(
                "{step} has nothing to run"
            )));
        }

        let outcome = self.executor.run(run, step).await?;

        // Result first: the step only counts as complete once it is stored
        if let Some(kind) = step.result_kind() {
            self.store
                .add_result(run, user_id, kind, &outcome.payload)
                .await?;
            self.store
                .log_activity(user_id, ActionType::ResultSaved(kind), &outcome.message)
                .await;
        }
        if let Some(status) = SequenceStatus::step_completed(step.index()) {
            self.promote(run, status).await?;
        }

        let newly_completed = self.mark_complete(user_id, session, step).await?;

        Ok(StepRun {
            step,
            title: step.title(),
            message: outcome.message,
            newly_completed,
            payload: outcome.payload,
        })
    }

    async fn mark_complete(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        step: Step,
    ) -> Result<bool, AnalysisError> {
        let run = Self::attached_id(session)?;
        if step == Step::Upload || session.is_complete(step) {
            return Ok(false);
        }

        let status = if step == Step::LAST {
            SequenceStatus::Completed
        } else {
            SequenceStatus::Processing
        };
        self.promote(run, status).await?;
        session.mark_complete(step);
        self.store
            .log_activity(
                user_id,
                ActionType::StepComplete(step.index()),
                &format!("Completed {step}"),
            )
            .await;

        Ok(true)
    }

    fn advance(&self, session: &mut PipelineSession) -> Result<Step, AnalysisError> {
        let current = session.current_step();
        if current == Step::Upload && session.sequence_id().is_none() {
            return Err(AnalysisError::Validation(
                "Upload a sequence before continuing".to_string(),
            ));
        }
        if current == Step::LAST {
            return Ok(current);
        }
        if !session.advance() {
            return Err(AnalysisError::Validation(format!(
                "Complete {current} before continuing"
            )));
        }
        Ok(session.current_step())
    }

    fn retreat(&self, session: &mut PipelineSession) -> Result<Step, AnalysisError> {
        session.retreat();
        Ok(session.current_step())
    }

    async fn reset(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<(), AnalysisError> {
        if let Some(run) = session.sequence_id() {
            self.owned_sequence(user_id, run).await?;
            self.artifacts().purge_derived(run).await?;
            self.store.reset_sequence(run).await?;
            self.store
                .log_activity(
                    user_id,
                    ActionType::SequenceReset,
                    &format!("Reset analysis of sequence {run}"),
                )
                .await;
        }
        session.reset();
        Ok(())
    }

    async fn resume(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
        sequence_id: SequenceId,
    ) -> Result<(), AnalysisError> {
        let sequence = self.owned_sequence(user_id, sequence_id).await?;
        let mut resumed = PipelineSession::resume(sequence_id, sequence.status);

        if let Some(report) = self.store.list_reports(sequence_id).await?.first() {
            resumed.set_report_id(report.id);
        }
        if self
            .store
            .latest_result(sequence_id, ResultKind::FinalResults)
            .await?
            .is_some()
        {
            resumed.set_final_results_saved();
        }

        *session = resumed;
        Ok(())
    }

    async fn final_results(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<AnalysisSummary, AnalysisError> {
        let run = self.attached(user_id, session).await?;
        if session.current_step() != Step::FinalResults {
            return Err(AnalysisError::Validation(format!(
                "Final results are available at {}",
                Step::FinalResults
            )));
        }

        let (_, summary) = self.aggregator.summarize_run(run).await;

        if !session.final_results_saved() {
            let payload = serde_json::to_value(&summary)
                .map_err(|e| AnalysisError::Internal(e.to_string()))?;
            self.store
                .add_result(run, user_id, ResultKind::FinalResults, &payload)
                .await?;
            self.promote(run, SequenceStatus::Analyzed).await?;
            let mut analyzed = serde_json::Map::new();
            analyzed.insert("gene_count".to_string(), json!(summary.gene_count));
            analyzed.insert("avg_gc_content".to_string(), json!(summary.avg_gc_content));
            self.store.update_sequence_metadata(run, &analyzed).await?;
            self.store
                .log_activity(
                    user_id,
                    ActionType::AnalysisComplete,
                    &format!(
                        "Analysis complete: {} genes, {} proteins",
                        summary.gene_count, summary.protein_count
                    ),
                )
                .await;
            session.set_final_results_saved();
        }

        self.mark_complete(user_id, session, Step::FinalResults).await?;
        Ok(summary)
    }

    async fn generate_report(
        &self,
        user_id: UserId,
        session: &mut PipelineSession,
    ) -> Result<ReportRecord, AnalysisError> {
        let run = self.attached(user_id, session).await?;
        if session.current_step() != Step::FinalResults {
            return Err(AnalysisError::Validation(format!(
                "Reports are generated at {}",
                Step::FinalResults
            )));
        }

        self.store
            .log_activity(
                user_id,
                ActionType::ReportGenerationStarted,
                &format!("Generating report for sequence {run}"),
            )
            .await;

        match self.build_report(user_id, run).await {
            Ok(record) => {
                self.store
                    .log_activity(
                        user_id,
                        ActionType::ReportGenerationCompleted,
                        &format!("Report {} generated", record.id),
                    )
                    .await;
                session.set_report_id(record.id);
                Ok(record)
            }
            Err(e) => {
                warn!(event = "report_failed", sequence_id = run.value(), error = %e, "Report generation failed");
                self.store
                    .log_activity(user_id, ActionType::ReportGenerationFailed, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    async fn download_report(
        &self,
        user_id: UserId,
        report_id: i32,
    ) -> Result<RenderedReport, AnalysisError> {
        let report = self
            .store
            .get_report(report_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AnalysisError::NotFound(format!("Report {report_id}")))?;

        let path = report
            .content
            .get("path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| AnalysisError::Internal(format!("Report {report_id} has no path")))?;
        let file_name = report
            .content
            .get("file_name")
            .and_then(|f| f.as_str())
            .unwrap_or("report.html")
            .to_string();

        let body = read_optional(Path::new(path))
            .await?
            .ok_or_else(|| AnalysisError::NotFound(format!("Report file {file_name}")))?;

        Ok(RenderedReport {
            file_name,
            content_type: self.renderer.content_type().to_string(),
            body,
        })
    }

    async fn annotation_terms(
        &self,
        session: &PipelineSession,
        gene_id: &str,
        threshold: f64,
    ) -> Result<Vec<GoTerm>, AnalysisError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnalysisError::Validation(
                "Threshold must be between 0 and 1".to_string(),
            ));
        }

        let run = Self::attached_id(session)?;
        let text = self
            .artifacts()
            .read(run, ArtifactKind::Annotations)
            .await?
            .ok_or_else(|| AnalysisError::NotFound("Annotation table".to_string()))?;

        let rows = annotation::read_annotations(&text)
            .map_err(|e| PipelineError::malformed(ArtifactKind::Annotations, e))?;

        rows.iter()
            .find(|row| row.gene_id == gene_id)
            .map(|row| row.terms_above(threshold))
            .ok_or_else(|| AnalysisError::NotFound(format!("Gene {gene_id}")))
    }

    async fn structure_models(
        &self,
        session: &PipelineSession,
    ) -> Result<Vec<ModelInfo>, AnalysisError> {
        let run = Self::attached_id(session)?;
        let mut models = Vec::new();

        for path in self.artifacts().list_models(run).await? {
            let Some(text) = read_optional(&path).await? else {
                continue;
            };
            let protein_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let file_name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            models.push(ModelInfo {
                protein_id,
                file_name,
                stats: model_stats(&text),
            });
        }

        Ok(models)
    }

    async fn list_sequences(
        &self,
        user_id: UserId,
        query: &SequenceQuery,
    ) -> Result<Vec<SequenceRecord>, AnalysisError> {
        Ok(self.store.list_user_sequences(user_id, query).await?)
    }

    async fn get_sequence(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<SequenceRecord, AnalysisError> {
        self.owned_sequence(user_id, sequence_id).await
    }

    async fn sequence_results(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<Vec<AnalysisResult>, AnalysisError> {
        self.owned_sequence(user_id, sequence_id).await?;
        Ok(self.store.list_results(sequence_id).await?)
    }

    async fn sequence_reports(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<Vec<ReportRecord>, AnalysisError> {
        self.owned_sequence(user_id, sequence_id).await?;
        Ok(self.store.list_reports(sequence_id).await?)
    }

    async fn delete_sequence(
        &self,
        user_id: UserId,
        sequence_id: SequenceId,
    ) -> Result<(), AnalysisError> {
        if !self.store.delete_sequence(sequence_id, user_id).await? {
            return Err(AnalysisError::NotFound(format!("Sequence {sequence_id}")));
        }

        if let Err(e) = self.artifacts().purge_all(sequence_id).await {
            warn!(sequence_id = sequence_id.value(), error = %e, "Failed to remove run artifacts");
        }

        self.store
            .log_activity(
                user_id,
                ActionType::SequenceDelete,
                &format!("Deleted sequence {sequence_id}"),
            )
            .await;
        Ok(())
    }
}

//! Pipeline state tracking and step execution.
//!
//! A [`PipelineSession`] is the per-user view of one run: a step pointer,
//! the set of completed steps and the attached sequence. It is plain data,
//! stored in the HTTP session and passed by reference to every operation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{ResultKind, SequenceId, SequenceStatus};

pub mod artifacts;
pub mod error;
pub mod executor;

pub use artifacts::{ArtifactKind, ArtifactStore};
pub use error::PipelineError;
pub use executor::{Collaborators, ExecutorSettings, StepExecutor, StepOutcome};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    #[default]
    Upload,
    GenePrediction,
    GoAnnotation,
    FunctionExtraction,
    ProteinModeling,
    FinalResults,
}

impl Step {
    pub const ALL: [Self; 6] = [
        Self::Upload,
        Self::GenePrediction,
        Self::GoAnnotation,
        Self::FunctionExtraction,
        Self::ProteinModeling,
        Self::FinalResults,
    ];

    pub const LAST: Self = Self::FinalResults;

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::GenePrediction => "Gene Prediction",
            Self::GoAnnotation => "GO Annotation",
            Self::FunctionExtraction => "Function Extraction",
            Self::ProteinModeling => "Protein Modeling",
            Self::FinalResults => "Final Results",
        }
    }

    /// Label used in metrics and logs.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::GenePrediction => "gene_prediction",
            Self::GoAnnotation => "go_annotation",
            Self::FunctionExtraction => "function_extraction",
            Self::ProteinModeling => "protein_modeling",
            Self::FinalResults => "final_results",
        }
    }

    /// Steps 1 to 4 run an external tool.
    #[must_use]
    pub const fn is_executable(self) -> bool {
        matches!(
            self,
            Self::GenePrediction | Self::GoAnnotation | Self::FunctionExtraction | Self::ProteinModeling
        )
    }

    /// Result type persisted when this step finishes.
    #[must_use]
    pub const fn result_kind(self) -> Option<ResultKind> {
        match self {
            Self::Upload => None,
            Self::GenePrediction => Some(ResultKind::GenePrediction),
            Self::GoAnnotation => Some(ResultKind::GoAnnotation),
            Self::FunctionExtraction => Some(ResultKind::FunctionExtraction),
            Self::ProteinModeling => Some(ResultKind::ProteinModeling),
            Self::FinalResults => Some(ResultKind::FinalResults),
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} ({})", self.index(), self.title())
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.index()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or_else(|| format!("Step index out of range: {value}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSession {
    current: Step,
    completed: BTreeSet<Step>,
    sequence_id: Option<SequenceId>,
    #[serde(default)]
    final_results_saved: bool,
    #[serde(default)]
    report_id: Option<i32>,
}

impl PipelineSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh run for a newly uploaded sequence.
    #[must_use]
    pub fn for_sequence(sequence_id: SequenceId) -> Self {
        Self {
            sequence_id: Some(sequence_id),
            ..Self::default()
        }
    }

    /// Rebuild a session from a persisted status, so a run can continue
    /// after its HTTP session expired.
    #[must_use]
    pub fn resume(sequence_id: SequenceId, status: SequenceStatus) -> Self {
        let (completed_through, current) = match status {
            SequenceStatus::Created | SequenceStatus::Processing => (0, Step::Upload),
            SequenceStatus::StepCompleted(n) => {
                (n, Step::from_index(n + 1).unwrap_or(Step::LAST))
            }
            SequenceStatus::Analyzed => (4, Step::FinalResults),
            SequenceStatus::Completed => (5, Step::FinalResults),
        };

        Self {
            current,
            completed: (1..=completed_through).filter_map(Step::from_index).collect(),
            sequence_id: Some(sequence_id),
            final_results_saved: matches!(status, SequenceStatus::Analyzed | SequenceStatus::Completed),
            report_id: None,
        }
    }

    #[must_use]
    pub const fn current_step(&self) -> Step {
        self.current
    }

    #[must_use]
    pub fn completed_steps(&self) -> Vec<Step> {
        self.completed.iter().copied().collect()
    }

    #[must_use]
    pub fn is_complete(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    #[must_use]
    pub const fn sequence_id(&self) -> Option<SequenceId> {
        self.sequence_id
    }

    #[must_use]
    pub const fn final_results_saved(&self) -> bool {
        self.final_results_saved
    }

    pub const fn set_final_results_saved(&mut self) {
        self.final_results_saved = true;
    }

    #[must_use]
    pub const fn report_id(&self) -> Option<i32> {
        self.report_id
    }

    pub const fn set_report_id(&mut self, id: i32) {
        self.report_id = Some(id);
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.current != Step::LAST
            && (self.current == Step::Upload || self.completed.contains(&self.current))
    }

    /// Move forward one step. Declines at the last step and while the
    /// current step is not complete. Upload is always passable here; the
    /// caller checks that a sequence is attached.
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        match self.current.next() {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Move back one step. Declines at the first step.
    pub fn retreat(&mut self) -> bool {
        match self.current.previous() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    /// Back to upload with nothing complete. The attached sequence stays.
    pub fn reset(&mut self) {
        self.current = Step::Upload;
        self.completed.clear();
        self.final_results_saved = false;
        self.report_id = None;
    }

    /// Record `step` as complete. Returns true only when it was not
    /// already recorded. Upload is never recorded.
    pub fn mark_complete(&mut self, step: Step) -> bool {
        if step == Step::Upload {
            return false;
        }
        self.completed.insert(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_indices() {
        assert_eq!(Step::from_index(0), Some(Step::Upload));
        assert_eq!(Step::from_index(5), Some(Step::FinalResults));
        assert_eq!(Step::from_index(6), None);
        assert_eq!(Step::FinalResults.next(), None);
        assert_eq!(Step::Upload.previous(), None);
        assert_eq!(serde_json::to_string(&Step::GoAnnotation).unwrap(), "2");
        assert!(serde_json::from_str::<Step>("9").is_err());
    }

    #[test]
    fn test_advance_requires_completion() {
        let mut session = PipelineSession::for_sequence(SequenceId::new(1));
        assert!(session.advance());
        assert_eq!(session.current_step(), Step::GenePrediction);

        assert!(!session.advance());
        assert_eq!(session.current_step(), Step::GenePrediction);

        assert!(session.mark_complete(Step::GenePrediction));
        assert!(session.advance());
        assert_eq!(session.current_step(), Step::GoAnnotation);
    }

    #[test]
    fn test_advance_then_retreat_restores_pointer() {
        let mut session = PipelineSession::for_sequence(SequenceId::new(1));
        session.advance();
        session.mark_complete(Step::GenePrediction);
        let before = session.clone();

        assert!(session.advance());
        assert!(session.retreat());
        assert_eq!(session, before);
    }

    #[test]
    fn test_bounds() {
        let mut session = PipelineSession::new();
        assert!(!session.retreat());
        assert_eq!(session.current_step(), Step::Upload);

        let mut finished = PipelineSession::resume(SequenceId::new(1), SequenceStatus::Completed);
        assert_eq!(finished.current_step(), Step::FinalResults);
        assert!(!finished.advance());
        assert_eq!(finished.current_step(), Step::FinalResults);
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let mut session = PipelineSession::new();
        assert!(session.mark_complete(Step::GoAnnotation));
        assert!(!session.mark_complete(Step::GoAnnotation));
        assert!(!session.mark_complete(Step::Upload));
        assert_eq!(session.completed_steps(), vec![Step::GoAnnotation]);
    }

    #[test]
    fn test_reset() {
        let mut session = PipelineSession::resume(SequenceId::new(3), SequenceStatus::Analyzed);
        session.set_report_id(9);
        session.reset();
        assert_eq!(session.current_step(), Step::Upload);
        assert!(session.completed_steps().is_empty());
        assert!(!session.final_results_saved());
        assert_eq!(session.report_id(), None);
        assert_eq!(session.sequence_id(), Some(SequenceId::new(3)));
    }

    #[test]
    fn test_resume_from_status() {
        let id = SequenceId::new(7);

        let session = PipelineSession::resume(id, SequenceStatus::StepCompleted(2));
        assert_eq!(session.current_step(), Step::FunctionExtraction);
        assert_eq!(
            session.completed_steps(),
            vec![Step::GenePrediction, Step::GoAnnotation]
        );

        let session = PipelineSession::resume(id, SequenceStatus::StepCompleted(4));
        assert_eq!(session.current_step(), Step::FinalResults);

        let session = PipelineSession::resume(id, SequenceStatus::Analyzed);
        assert_eq!(session.completed_steps().len(), 4);
        assert!(session.final_results_saved());

        let session = PipelineSession::resume(id, SequenceStatus::Completed);
        assert!(session.is_complete(Step::FinalResults));

        let session = PipelineSession::resume(id, SequenceStatus::Processing);
        assert_eq!(session.current_step(), Step::Upload);
        assert!(session.completed_steps().is_empty());
    }

    #[test]
    fn test_session_survives_serialization() {
        let session = PipelineSession::resume(SequenceId::new(2), SequenceStatus::StepCompleted(1));
        let json = serde_json::to_string(&session).unwrap();
        let back: PipelineSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}

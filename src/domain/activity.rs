use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload type of a persisted analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    GenePrediction,
    GoAnnotation,
    FunctionExtraction,
    ProteinModeling,
    FinalResults,
}

impl ResultKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenePrediction => "gene_prediction",
            Self::GoAnnotation => "go_annotation",
            Self::FunctionExtraction => "function_extraction",
            Self::ProteinModeling => "protein_modeling",
            Self::FinalResults => "final_results",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gene_prediction" => Ok(Self::GenePrediction),
            "go_annotation" => Ok(Self::GoAnnotation),
            "function_extraction" => Ok(Self::FunctionExtraction),
            "protein_modeling" => Ok(Self::ProteinModeling),
            "final_results" => Ok(Self::FinalResults),
            other => Err(format!("Unknown result type: {other}")),
        }
    }
}

/// Audit vocabulary written to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    UserCreate,
    UserLogout,
    PasswordChange,
    PasswordReset,
    UsernameUpdate,
    ProfilePhotoUpdate,
    ProfilePhotoRemove,
    UserDeactivate,
    SequenceUpload,
    SequenceUpdate,
    SequenceDelete,
    SequenceReset,
    StepComplete(u8),
    ResultSaved(ResultKind),
    AnalysisComplete,
    ReportGenerationStarted,
    ReportGenerationCompleted,
    ReportGenerationFailed,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserCreate => "user_create",
            Self::UserLogout => "user_logout",
            Self::PasswordChange => "password_change",
            Self::PasswordReset => "password_reset",
            Self::UsernameUpdate => "username_update",
            Self::ProfilePhotoUpdate => "profile_photo_update",
            Self::ProfilePhotoRemove => "profile_photo_remove",
            Self::UserDeactivate => "user_deactivate",
            Self::SequenceUpload => "sequence_upload",
            Self::SequenceUpdate => "sequence_update",
            Self::SequenceDelete => "sequence_delete",
            Self::SequenceReset => "sequence_reset",
            Self::StepComplete(step) => return write!(f, "step_complete_{step}"),
            Self::ResultSaved(kind) => return write!(f, "{kind}_complete"),
            Self::AnalysisComplete => "analysis_complete",
            Self::ReportGenerationStarted => "report_generation_started",
            Self::ReportGenerationCompleted => "report_generation_completed",
            Self::ReportGenerationFailed => "report_generation_failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names() {
        assert_eq!(ActionType::StepComplete(2).to_string(), "step_complete_2");
        assert_eq!(
            ActionType::ResultSaved(ResultKind::GoAnnotation).to_string(),
            "go_annotation_complete"
        );
        assert_eq!(ActionType::SequenceReset.to_string(), "sequence_reset");
    }

    #[test]
    fn result_kind_round_trips_through_text() {
        for kind in [
            ResultKind::GenePrediction,
            ResultKind::GoAnnotation,
            ResultKind::FunctionExtraction,
            ResultKind::ProteinModeling,
            ResultKind::FinalResults,
        ] {
            assert_eq!(kind.as_str().parse::<ResultKind>().unwrap(), kind);
        }
    }
}

pub use super::activity_log::Entity as ActivityLog;
pub use super::analysis_results::Entity as AnalysisResults;
pub use super::reports::Entity as Reports;
pub use super::sequences::Entity as Sequences;
pub use super::users::Entity as Users;

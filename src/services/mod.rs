pub mod analysis_service;
pub mod analysis_service_impl;
pub use analysis_service::{
    AnalysisError, AnalysisService, ModelInfo, RenderedReport, StepRun, UploadRequest,
    UploadSource,
};
pub use analysis_service_impl::SeaOrmAnalysisService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, Registration, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod history;
pub use history::{HistoryService, UsageSummary};

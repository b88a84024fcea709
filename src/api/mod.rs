use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use tokio::sync::RwLock;

use crate::config::Config;
use crate::constants::limits::MAX_UPLOAD_BYTES;
use crate::services::{AnalysisService, AuthService, HistoryService};
use crate::state::SharedState;
use metrics_exporter_prometheus::PrometheusHandle;

mod account;
pub mod auth;
mod error;
mod history;
mod observability;
mod pipeline;
mod reports;
mod sequences;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn analysis_service(&self) -> &Arc<dyn AnalysisService> {
        &self.shared.analysis_service
    }

    #[must_use]
    pub fn history_service(&self) -> &Arc<HistoryService> {
        &self.shared.history_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, inactivity_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_inactivity_minutes,
        )
    };

    let protected_routes = create_protected_router();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            inactivity_minutes,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/system/health", get(system::health_ready))
        .route("/system/health/live", get(system::health_live))
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(observability::security_headers_middleware))
}

fn create_protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/account/username", put(account::update_username))
        .route("/account/password", put(account::change_password))
        .route("/account/photo", put(account::set_photo))
        .route("/account/photo", delete(account::remove_photo))
        .route("/account/deactivate", post(account::deactivate))
        .route("/pipeline", get(pipeline::get_pipeline))
        .route("/pipeline/upload", post(pipeline::upload))
        .route("/pipeline/run", post(pipeline::run_step))
        .route("/pipeline/advance", post(pipeline::advance))
        .route("/pipeline/retreat", post(pipeline::retreat))
        .route("/pipeline/reset", post(pipeline::reset))
        .route("/pipeline/resume/{id}", post(pipeline::resume))
        .route("/pipeline/final", post(pipeline::final_results))
        .route("/pipeline/report", post(pipeline::generate_report))
        .route(
            "/pipeline/annotations/{gene_id}",
            get(pipeline::annotation_terms),
        )
        .route("/pipeline/models", get(pipeline::structure_models))
        .route("/sequences", get(sequences::list_sequences))
        .route("/sequences/{id}", get(sequences::get_sequence))
        .route("/sequences/{id}", delete(sequences::delete_sequence))
        .route("/sequences/{id}/results", get(sequences::get_results))
        .route("/sequences/{id}/reports", get(sequences::get_reports))
        .route("/reports/{id}/download", get(reports::download_report))
        .route("/history", get(history::get_history))
        .route("/history/stats", get(history::get_statistics))
        .route("/history/summary", get(history::get_summary))
        .route("/history/analyzed", get(history::get_analyzed))
        .route("/history/{id}", delete(history::delete_entry))
        .route("/system/status", get(system::get_status))
        .route_layer(middleware::from_fn(auth::auth_middleware))
}

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::config::SecurityConfig;
use crate::domain::{ActionType, ResultKind, SequenceId, SequenceStatus, UserId};

pub mod migrator;
pub mod repositories;

pub use repositories::activity::{ActionCount, ActivityEntry, HistoryQuery};
pub use repositories::report::{ReportRecord, STANDARD_REPORT};
pub use repositories::result::AnalysisResult;
pub use repositories::sequence::{SequenceQuery, SequenceRecord, StatusChange};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn sequence_repo(&self) -> repositories::sequence::SequenceRepository {
        repositories::sequence::SequenceRepository::new(self.conn.clone())
    }

    fn result_repo(&self) -> repositories::result::ResultRepository {
        repositories::result::ResultRepository::new(self.conn.clone())
    }

    fn report_repo(&self) -> repositories::report::ReportRepository {
        repositories::report::ReportRepository::new(self.conn.clone())
    }

    fn activity_repo(&self) -> repositories::activity::ActivityRepository {
        repositories::activity::ActivityRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, security)
            .await
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn verify_user_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_credentials(email, password).await
    }

    pub async fn verify_user_password(&self, id: UserId, password: &str) -> Result<bool> {
        self.user_repo().verify_password(id, password).await
    }

    pub async fn update_username(&self, id: UserId, username: &str) -> Result<bool> {
        self.user_repo().update_username(id, username).await
    }

    pub async fn update_user_password(
        &self,
        id: UserId,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo()
            .update_password(id, new_password, security)
            .await
    }

    pub async fn reset_user_password(
        &self,
        email: &str,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .reset_password(email, new_password, security)
            .await
    }

    pub async fn set_profile_photo(&self, id: UserId, photo: Option<String>) -> Result<bool> {
        self.user_repo().set_profile_photo(id, photo).await
    }

    pub async fn clear_profile_photo(&self, id: UserId) -> Result<bool> {
        self.user_repo().set_profile_photo(id, None).await
    }

    pub async fn deactivate_user(&self, id: UserId) -> Result<bool> {
        self.user_repo().deactivate(id).await
    }

    // Sequences

    pub async fn create_sequence(
        &self,
        user_id: UserId,
        name: &str,
        content: &str,
        metadata: &Value,
    ) -> Result<SequenceRecord> {
        self.sequence_repo()
            .create(user_id, name, content, metadata)
            .await
    }

    pub async fn get_sequence(&self, id: SequenceId) -> Result<Option<SequenceRecord>> {
        self.sequence_repo().get(id).await
    }

    pub async fn get_user_sequence(
        &self,
        id: SequenceId,
        user_id: UserId,
    ) -> Result<Option<SequenceRecord>> {
        self.sequence_repo().get_owned(id, user_id).await
    }

    pub async fn list_user_sequences(
        &self,
        user_id: UserId,
        query: &SequenceQuery,
    ) -> Result<Vec<SequenceRecord>> {
        self.sequence_repo().list_for_user(user_id, query).await
    }

    pub async fn update_sequence_metadata(
        &self,
        id: SequenceId,
        patch: &Map<String, Value>,
    ) -> Result<bool> {
        self.sequence_repo().merge_metadata(id, patch).await
    }

    pub async fn promote_sequence_status(
        &self,
        id: SequenceId,
        next: SequenceStatus,
    ) -> Result<StatusChange> {
        self.sequence_repo().promote_status(id, next).await
    }

    pub async fn reset_sequence(&self, id: SequenceId) -> Result<bool> {
        self.sequence_repo().reset(id).await
    }

    pub async fn delete_sequence(&self, id: SequenceId, user_id: UserId) -> Result<bool> {
        self.sequence_repo().delete_cascade(id, user_id).await
    }

    // Results and reports

    pub async fn add_result(
        &self,
        sequence_id: SequenceId,
        user_id: UserId,
        kind: ResultKind,
        data: &Value,
    ) -> Result<AnalysisResult> {
        self.result_repo()
            .add(sequence_id, user_id, kind, data)
            .await
    }

    pub async fn list_results(&self, sequence_id: SequenceId) -> Result<Vec<AnalysisResult>> {
        self.result_repo().list(sequence_id).await
    }

    pub async fn latest_result(
        &self,
        sequence_id: SequenceId,
        kind: ResultKind,
    ) -> Result<Option<AnalysisResult>> {
        self.result_repo().latest(sequence_id, kind).await
    }

    pub async fn add_report(
        &self,
        sequence_id: SequenceId,
        user_id: UserId,
        report_type: &str,
        content: &Value,
    ) -> Result<ReportRecord> {
        self.report_repo()
            .add(sequence_id, user_id, report_type, content)
            .await
    }

    pub async fn get_report(&self, id: i32) -> Result<Option<ReportRecord>> {
        self.report_repo().get(id).await
    }

    pub async fn list_reports(&self, sequence_id: SequenceId) -> Result<Vec<ReportRecord>> {
        self.report_repo().list(sequence_id).await
    }

    // Activity log

    /// Append an audit entry. Best-effort: a failed write is logged and
    /// never fails the operation that triggered it.
    pub async fn log_activity(&self, user_id: UserId, action: ActionType, description: &str) {
        let action_type = action.to_string();
        if let Err(e) = self
            .activity_repo()
            .add(user_id, &action_type, description)
            .await
        {
            error!(
                event = "activity_log_failed",
                user_id = user_id.value(),
                action_type = %action_type,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    pub async fn get_history(
        &self,
        user_id: UserId,
        query: &HistoryQuery,
    ) -> Result<Vec<ActivityEntry>> {
        self.activity_repo().history(user_id, query).await
    }

    pub async fn count_activities(&self, user_id: UserId) -> Result<u64> {
        self.activity_repo().count_for_user(user_id).await
    }

    pub async fn delete_history_entry(&self, id: i64, user_id: UserId) -> Result<bool> {
        self.activity_repo().delete_entry(id, user_id).await
    }

    pub async fn activity_statistics(&self, user_id: UserId) -> Result<Vec<ActionCount>> {
        self.activity_repo().statistics(user_id).await
    }

    pub async fn prune_history(&self, older_than_days: i64) -> Result<u64> {
        self.activity_repo().prune(older_than_days).await
    }
}

mod account;
mod history;
mod sequences;

use anyhow::Context;

use crate::config::Config;
use crate::db::{Store, User};

pub use account::cmd_reset_password;
pub use history::{cmd_history, cmd_prune_history, cmd_stats};
pub use sequences::cmd_sequences;

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    .context("Failed to open database")
}

async fn find_user(store: &Store, email: &str) -> anyhow::Result<User> {
    store
        .get_user_by_email(&email.trim().to_lowercase())
        .await?
        .with_context(|| format!("No account registered for {email}"))
}

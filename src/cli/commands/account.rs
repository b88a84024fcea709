use super::open_store;
use crate::config::Config;
use crate::services::{AuthService, SeaOrmAuthService};

pub async fn cmd_reset_password(config: &Config, email: &str, password: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let auth = SeaOrmAuthService::new(store, config.security.clone());

    let user = auth
        .reset_password(email, password)
        .await?;

    println!("✓ Password reset for {} <{}>", user.username, user.email);
    Ok(())
}

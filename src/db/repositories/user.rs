use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tokio::task;

use super::now_timestamp;
use crate::config::SecurityConfig;
use crate::domain::UserId;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub profile_photo: Option<String>,
    pub is_active: bool,
    pub deactivated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            email: model.email,
            username: model.username,
            profile_photo: model.profile_photo,
            is_active: model.is_active,
            deactivated_at: model.deactivated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<User> {
        let password = password.to_string();
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let now = now_timestamp();
        let active = users::ActiveModel {
            email: Set(email.to_string()),
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            profile_photo: Set(None),
            is_active: Set(true),
            deactivated_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Verify email and password. Deactivated accounts never match.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        if verify_hash(user.password_hash.clone(), password.to_string()).await? {
            Ok(Some(User::from(user)))
        } else {
            Ok(None)
        }
    }

    pub async fn verify_password(&self, id: UserId, password: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        match user {
            Some(user) => verify_hash(user.password_hash, password.to_string()).await,
            None => Ok(false),
        }
    }

    pub async fn update_username(&self, id: UserId, username: &str) -> Result<bool> {
        let Some(user) = self.find_model(id).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.username = Set(username.to_string());
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn update_password(
        &self,
        id: UserId,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let Some(user) = self.find_model(id).await? else {
            return Ok(false);
        };

        self.store_password(user, new_password, security).await?;
        Ok(true)
    }

    /// Reset the password of the account registered under `email`.
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password reset")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let updated = self.store_password(user, new_password, security).await?;
        Ok(Some(User::from(updated)))
    }

    /// Set or clear the profile photo.
    pub async fn set_profile_photo(&self, id: UserId, photo: Option<String>) -> Result<bool> {
        let Some(user) = self.find_model(id).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.profile_photo = Set(photo);
        active.updated_at = Set(now_timestamp());
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Soft-deactivate a user. The row is kept.
    pub async fn deactivate(&self, id: UserId) -> Result<bool> {
        let Some(user) = self.find_model(id).await? else {
            return Ok(false);
        };

        let now = now_timestamp();
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(false);
        active.deactivated_at = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(true)
    }

    async fn find_model(&self, id: UserId) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    async fn store_password(
        &self,
        user: users::Model,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<users::Model> {
        let password = new_password.to_string();
        let security = security.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(now_timestamp());
        let updated = active.update(&self.conn).await?;

        Ok(updated)
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Argon2 verification is CPU-bound, so it runs on the blocking pool.
async fn verify_hash(password_hash: String, password: String) -> Result<bool> {
    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

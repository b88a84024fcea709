//! Domain service for accounts.
//!
//! Registration, login by email, password changes and resets, username and
//! profile photo updates, and soft deactivation. Every change is written to
//! the activity log.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::PasswordPolicy;
use crate::db::User;
use crate::domain::UserId;

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// User info DTO for responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub has_profile_photo: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            has_profile_photo: user.profile_photo.is_some(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a malformed username or email, a
    /// password that breaks the policy, a confirmation mismatch, or an email
    /// or username that is already taken.
    async fn register(&self, registration: &Registration) -> Result<UserInfo, AuthError>;

    /// Verifies email and password of an active account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError>;

    async fn logout(&self, user_id: UserId);

    async fn get_user_info(&self, user_id: UserId) -> Result<UserInfo, AuthError>;

    /// Changes a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is incorrect
    /// or the new password is invalid.
    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError>;

    /// Operator reset by email, without the current password.
    async fn reset_password(&self, email: &str, new_password: &str)
    -> Result<UserInfo, AuthError>;

    async fn update_username(&self, user_id: UserId, username: &str)
    -> Result<UserInfo, AuthError>;

    /// Stores a base64 encoded image as the profile photo.
    async fn set_profile_photo(&self, user_id: UserId, photo: &str) -> Result<(), AuthError>;

    async fn remove_profile_photo(&self, user_id: UserId) -> Result<(), AuthError>;

    async fn deactivate(&self, user_id: UserId) -> Result<(), AuthError>;
}

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;

pub fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::Validation(
            "Username can only contain letters, numbers, hyphens, and underscores".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid regex")
    });

    if re.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email address".to_string()))
    }
}

/// Checks length, digit and special-character minimums, then the
/// confirmation.
pub fn validate_password(
    policy: &PasswordPolicy,
    password: &str,
    confirmation: &str,
) -> Result<(), AuthError> {
    let mut problems = Vec::new();

    if password.chars().count() < policy.min_length {
        problems.push(format!("at least {} characters", policy.min_length));
    }
    if password.chars().filter(char::is_ascii_digit).count() < policy.min_digits {
        problems.push(format!("at least {} digits", policy.min_digits));
    }
    if password
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count()
        < policy.min_special
    {
        problems.push(format!("at least {} special characters", policy.min_special));
    }

    if !problems.is_empty() {
        return Err(AuthError::Validation(format!(
            "Password must contain {}",
            problems.join(", ")
        )));
    }

    if password != confirmation {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a-b").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.org").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::default();
        assert!(validate_password(&policy, "abc12!", "abc12!").is_ok());
        // too short
        assert!(validate_password(&policy, "a1!2", "a1!2").is_err());
        // one digit
        assert!(validate_password(&policy, "abcde1!", "abcde1!").is_err());
        // no special character
        assert!(validate_password(&policy, "abcde12", "abcde12").is_err());

        let Err(AuthError::Validation(msg)) = validate_password(&policy, "abc12!", "abc12?") else {
            panic!("expected mismatch");
        };
        assert_eq!(msg, "Passwords do not match");
    }
}

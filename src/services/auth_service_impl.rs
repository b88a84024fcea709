//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{ActionType, UserId};
use crate::services::auth_service::{
    AuthError, AuthService, Registration, UserInfo, validate_email, validate_password,
    validate_username,
};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), AuthError> {
        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::Validation(format!(
                "Username '{username}' is already taken"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: &Registration) -> Result<UserInfo, AuthError> {
        let username = registration.username.trim();
        let email = Self::normalize_email(&registration.email);

        validate_username(username)?;
        validate_email(&email)?;
        validate_password(
            &self.security.password_policy,
            &registration.password,
            &registration.confirm_password,
        )?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::Validation(
                "An account with this email already exists".to_string(),
            ));
        }
        self.ensure_username_free(username).await?;

        let user = self
            .store
            .create_user(username, &email, &registration.password, &self.security)
            .await?;

        self.store
            .log_activity(
                user.id,
                ActionType::UserCreate,
                &format!("Account created for {username}"),
            )
            .await;
        info!(event = "user_registered", user_id = user.id.value(), "User registered");

        Ok(UserInfo::from(user))
    }

    async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError> {
        let email = Self::normalize_email(email);
        let user = self
            .store
            .verify_user_credentials(&email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(UserInfo::from(user))
    }

    async fn logout(&self, user_id: UserId) {
        self.store
            .log_activity(user_id, ActionType::UserLogout, "Logged out")
            .await;
    }

    async fn get_user_info(&self, user_id: UserId) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo::from(user))
    }

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        validate_password(&self.security.password_policy, new_password, confirm_password)?;

        let is_valid = self
            .store
            .verify_user_password(user_id, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        if !self
            .store
            .update_user_password(user_id, new_password, &self.security)
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        self.store
            .log_activity(user_id, ActionType::PasswordChange, "Password changed")
            .await;

        Ok(())
    }

    async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<UserInfo, AuthError> {
        validate_password(&self.security.password_policy, new_password, new_password)?;

        let email = Self::normalize_email(email);
        let user = self
            .store
            .reset_user_password(&email, new_password, &self.security)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.store
            .log_activity(user.id, ActionType::PasswordReset, "Password reset by operator")
            .await;

        Ok(UserInfo::from(user))
    }

    async fn update_username(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let username = username.trim();
        validate_username(username)?;

        let current = self.get_user_info(user_id).await?;
        if current.username == username {
            return Ok(current);
        }
        self.ensure_username_free(username).await?;

        self.store.update_username(user_id, username).await?;
        self.store
            .log_activity(
                user_id,
                ActionType::UsernameUpdate,
                &format!("Username changed from {} to {username}", current.username),
            )
            .await;

        self.get_user_info(user_id).await
    }

    async fn set_profile_photo(&self, user_id: UserId, photo: &str) -> Result<(), AuthError> {
        let photo = photo.trim();
        if photo.is_empty() {
            return Err(AuthError::Validation("Profile photo is empty".to_string()));
        }
        if photo.len() > self.security.max_profile_photo_bytes {
            return Err(AuthError::Validation(format!(
                "Profile photo exceeds {} bytes",
                self.security.max_profile_photo_bytes
            )));
        }

        if !self
            .store
            .set_profile_photo(user_id, Some(photo.to_string()))
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        self.store
            .log_activity(user_id, ActionType::ProfilePhotoUpdate, "Profile photo updated")
            .await;
        Ok(())
    }

    async fn remove_profile_photo(&self, user_id: UserId) -> Result<(), AuthError> {
        if !self.store.clear_profile_photo(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        self.store
            .log_activity(user_id, ActionType::ProfilePhotoRemove, "Profile photo removed")
            .await;
        Ok(())
    }

    async fn deactivate(&self, user_id: UserId) -> Result<(), AuthError> {
        if !self.store.deactivate_user(user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        self.store
            .log_activity(user_id, ActionType::UserDeactivate, "Account deactivated")
            .await;
        info!(event = "user_deactivated", user_id = user_id.value(), "User deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::HistoryQuery;

    fn fast_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..Default::default()
        }
    }

    async fn service() -> (SeaOrmAuthService, Store) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        (SeaOrmAuthService::new(store.clone(), fast_security()), store)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "secret12!".to_string(),
            confirm_password: "secret12!".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (service, store) = service().await;
        let user = service
            .register(&registration("alice", "Alice@Example.org"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.org");

        let logged_in = service.login("alice@example.org", "secret12!").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(matches!(
            service.login("alice@example.org", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        let history = store
            .get_history(user.id, &HistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(history[0].action_type, "user_create");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let (service, _) = service().await;
        service
            .register(&registration("alice", "alice@example.org"))
            .await
            .unwrap();

        assert!(matches!(
            service.register(&registration("alice2", "alice@example.org")).await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.register(&registration("alice", "other@example.org")).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password_and_deactivate() {
        let (service, _) = service().await;
        let user = service
            .register(&registration("bob", "bob@example.org"))
            .await
            .unwrap();

        assert!(matches!(
            service
                .change_password(user.id, "wrong12!", "better34?", "better34?")
                .await,
            Err(AuthError::Validation(_))
        ));
        service
            .change_password(user.id, "secret12!", "better34?", "better34?")
            .await
            .unwrap();
        service.login("bob@example.org", "better34?").await.unwrap();

        service.deactivate(user.id).await.unwrap();
        assert!(matches!(
            service.login("bob@example.org", "better34?").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_profile_photo_bounds() {
        let (service, store) = service().await;
        let user = service
            .register(&registration("carol", "carol@example.org"))
            .await
            .unwrap();

        let too_big = "A".repeat(fast_security().max_profile_photo_bytes + 1);
        assert!(service.set_profile_photo(user.id, &too_big).await.is_err());

        service.set_profile_photo(user.id, "aGVsbG8=").await.unwrap();
        assert!(service.get_user_info(user.id).await.unwrap().has_profile_photo);

        service.remove_profile_photo(user.id).await.unwrap();
        let stored = store.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.profile_photo, None);
    }
}

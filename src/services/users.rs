//! Account registration and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AccountError, AppError, AppResult},
    models::user::{ChangePassword, CreateUser, User, UserClaims, UserInfo},
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Arc<dyn UserStore>,
    config: AuthConfig,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl UsersService {
    pub fn new(repository: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account
    pub async fn register(&self, user: CreateUser) -> AppResult<UserInfo> {
        user.validate()?;

        if self.repository.login_exists(&user.login).await? {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        // A concurrent registration of the same login is caught by the store
        let password = hash_password(&user.password)?;
        let created = self.repository.create(&user, &password).await?;

        tracing::info!(user_id = created.id, login = %created.login, "User registered");
        Ok(created.into())
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .get_by_login(login)
            .await?
            .ok_or(AccountError::BadCredentials)?;

        if user.account_locked {
            return Err(AccountError::AccountLocked.into());
        }
        if !user.enabled {
            return Err(AccountError::AccountDisabled.into());
        }
        if !verify_password(&user.password, password)? {
            tracing::warn!(login = %user.login, "Failed login attempt");
            return Err(AccountError::BadCredentials.into());
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Change the password of the authenticated user
    pub async fn change_password(&self, login: &str, request: ChangePassword) -> AppResult<()> {
        request.validate()?;

        if request.new_password != request.confirmation_password {
            return Err(AccountError::NewPasswordDoesNotMatch.into());
        }

        let user = self.get_by_login(login).await?;
        if !verify_password(&user.password, &request.current_password)? {
            return Err(AccountError::IncorrectCurrentPassword.into());
        }

        let password = hash_password(&request.new_password)?;
        self.repository.update_password(user.id, &password).await?;

        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Get user by login
    pub async fn get_by_login(&self, login: &str) -> AppResult<User> {
        self.repository
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", login)))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

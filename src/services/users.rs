//! Authentication and user account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, TokenOwner, User, UserInfo},
    repository::Repository,
};

/// Number of random bytes in a token key (hex encoded to 40 chars)
pub const TOKEN_BYTES: usize = 20;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if (request.password.chars().count() as u64) < self.config.min_password_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = hash_password(&request.password)?;
        let user = self.repository.users.create(&request.username, &hash).await?;

        tracing::info!("Registered user id={} ({})", user.id, user.username);
        Ok(user)
    }

    /// Check credentials and return the user's token, creating one if needed
    pub async fn authenticate(&self, request: &LoginRequest) -> AppResult<String> {
        let (Some(username), Some(password)) =
            (request.username.as_deref(), request.password.as_deref())
        else {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        };

        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&user.password, password)? {
            tracing::warn!("Failed login attempt for user id={}", user.id);
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let mut token = self
            .repository
            .users
            .get_or_create_token(user.id, &generate_token_key())
            .await?;

        if is_expired(token.created_at, self.config.token_ttl_hours, Utc::now()) {
            self.repository.users.delete_tokens_for_user(user.id).await?;
            token = self
                .repository
                .users
                .get_or_create_token(user.id, &generate_token_key())
                .await?;
        }

        tracing::debug!("User id={} logged in", user.id);
        Ok(token.key)
    }

    /// Resolve a bearer token to its owner, rejecting unknown or expired keys
    pub async fn resolve_token(&self, key: &str) -> AppResult<TokenOwner> {
        let owner = self
            .repository
            .users
            .find_token_owner(key)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid token".to_string()))?;

        if is_expired(owner.token_created_at, self.config.token_ttl_hours, Utc::now()) {
            self.repository.users.delete_token(key).await?;
            return Err(AppError::Authentication("Token has expired".to_string()));
        }

        Ok(owner)
    }

    /// Revoke a token
    pub async fn logout(&self, key: &str) -> AppResult<()> {
        self.repository.users.delete_token(key).await
    }

    pub async fn get_user_info(&self, id: i32) -> AppResult<UserInfo> {
        self.repository.users.get_by_id(id).await.map(UserInfo::from)
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Fresh random token key
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_expired(created_at: DateTime<Utc>, ttl_hours: Option<u64>, now: DateTime<Utc>) -> bool {
    // A TTL beyond what chrono can represent never runs out
    let ttl = ttl_hours
        .and_then(|hours| i64::try_from(hours).ok())
        .and_then(Duration::try_hours);

    match ttl {
        Some(ttl) => now - created_at >= ttl,
        None => false,
    }
}

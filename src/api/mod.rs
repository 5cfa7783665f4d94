//! API handlers for the library catalog REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod health;
pub mod openapi;
pub mod publishers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, AppState};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(BookPage = PaginatedResponse<crate::models::Book>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Page content
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

/// Identity of the caller behind a valid token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i32,
    pub username: String,
    pub token: String,
}

/// Extractor for an authenticated user from the Authorization header
pub struct AuthenticatedUser(pub CurrentUser);

/// Pull the token out of `Bearer <key>` or `Token <key>`
fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token") {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = token_from_header(auth_header)
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let owner = state.services.users.resolve_token(token).await?;

        Ok(AuthenticatedUser(CurrentUser {
            user_id: owner.user_id,
            username: owner.username,
            token: token.to_string(),
        }))
    }
}

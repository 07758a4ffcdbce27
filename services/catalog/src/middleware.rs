//! Authentication middleware for bearer token validation

use axum::{extract::State, http::Request, middleware::Next, response::Response};
use tracing::error;

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Authenticated user attached to the request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

/// Authentication middleware
///
/// Requires a `Bearer` token minted at verification time. The token may
/// outlive the account, so the user record is re-checked on every request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract the Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    // Check if it's a Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    // Validate the token
    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|_| ApiError::Unauthenticated)?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user {}: {}", claims.sub, e);
            ApiError::Internal
        })?
        .ok_or(ApiError::Unauthenticated)?;

    // Insert the user into the request extensions
    req.extensions_mut().insert(CurrentUser { user });

    // Call the next service
    let response = next.run(req).await;

    Ok(response)
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }
}

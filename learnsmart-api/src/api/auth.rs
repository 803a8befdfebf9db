//! Bearer token authentication
//!
//! Protected routes run behind [`auth_middleware`], which validates the
//! `Authorization: Bearer <token>` header and stores the caller as an
//! [`AuthUser`] request extension for handlers to extract. The account is
//! re-read on every request, so role changes and deleted accounts take
//! effect before the token expires.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use learnsmart_common::auth::{validate_token, Role};

use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated caller as currently stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// 403 unless the caller may create and edit courses
    pub fn require_course_author(&self) -> ApiResult<()> {
        if self.role.can_author_courses() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only instructors and admins can manage courses".to_string(),
            ))
        }
    }
}

/// Token from an `Authorization` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authentication middleware
///
/// Missing header → 401 "Authentication required"; bad signature, expired
/// or malformed token, or a token for an account that no longer exists →
/// 401 "Invalid token".
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let invalid = || ApiError::Unauthorized("Invalid token".to_string());

    let claims = validate_token(&state.tokens, token).map_err(|e| {
        debug!("Rejected token: {}", e);
        invalid()
    })?;

    let user = users::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            debug!(user = %claims.sub, "Token for unknown account");
            invalid()
        })?;
    if user.role != claims.role {
        debug!(user = %user.id, token_role = %claims.role, role = %user.role, "Role changed since token was issued");
    }

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

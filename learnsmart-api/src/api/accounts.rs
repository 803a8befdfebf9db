//! Account endpoints: signup, login, profile, password change

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use learnsmart_common::auth::password::check_password_strength;
use learnsmart_common::auth::{hash_password, issue_token, verify_password, Role};
use learnsmart_common::Error as CommonError;

use super::{ApiJson, AuthUser};
use crate::db::users::{self, NewUser, SafeUser, User};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SafeUser,
}

/// Argon2 is deliberately slow; keep it off the async workers
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, stored_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

fn respond_with_token(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let token = issue_token(&state.tokens, user.id, &user.email, user.role)?;
    Ok(AuthResponse {
        token,
        user: SafeUser::from(user),
    })
}

async fn load_user(state: &AppState, caller: &AuthUser) -> ApiResult<User> {
    users::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let name = req.name.trim();
    let email = users::normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    check_password_strength(&req.password)?;

    let password_hash = hash_blocking(req.password).await?;
    let user = users::insert_user(
        &state.db,
        NewUser {
            name: name.to_string(),
            email,
            password_hash,
            role: Role::User,
        },
    )
    .await
    .map_err(|e| match e {
        CommonError::Conflict(msg) => ApiError::BadRequest(msg),
        other => other.into(),
    })?;

    info!(user = %user.id, "Account created");
    Ok((StatusCode::CREATED, Json(respond_with_token(&state, &user)?)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = users::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    Ok(Json(respond_with_token(&state, &user)?))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<SafeUser>> {
    let user = load_user(&state, &caller).await?;
    Ok(Json(SafeUser::from(&user)))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<Json<SafeUser>> {
    let name = req.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
    }

    let user = users::update_profile(&state.db, caller.id, name, req.avatar.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(SafeUser::from(&user)))
}

/// PUT /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let user = load_user(&state, &caller).await?;

    if !verify_blocking(req.current_password, user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }
    check_password_strength(&req.new_password)?;

    let password_hash = hash_blocking(req.new_password).await?;
    users::update_password(&state.db, user.id, &password_hash).await?;

    info!(user = %user.id, "Password changed");
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

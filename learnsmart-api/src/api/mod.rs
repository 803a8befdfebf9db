//! HTTP API handlers for learnsmart-api

pub mod accounts;
pub mod auth;
pub mod buildinfo;
pub mod courses;
pub mod enrollments;
pub mod gamification;
pub mod health;
pub mod preferences;
pub mod roadmap;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

pub use auth::{auth_middleware, AuthUser};
pub use buildinfo::get_build_info;
pub use health::health_routes;

/// JSON body extractor whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the API error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

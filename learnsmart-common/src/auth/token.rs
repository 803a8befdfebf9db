//! Bearer tokens (HS256 JWT)
//!
//! Tokens carry the user id, email and role. The signing secret comes from
//! configuration when set; otherwise a random secret is generated on first
//! start and kept in the `settings` table so tokens survive restarts.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::Role;
use crate::{Error, Result};

/// Settings key for the generated signing secret
pub const SECRET_SETTING_KEY: &str = "jwt_signing_secret";

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

const GENERATED_SECRET_BYTES: usize = 32;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Encoding/decoding keys derived from one secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Issue a signed token for a user
pub fn issue_token(keys: &TokenKeys, user_id: Uuid, email: &str, role: Role) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + keys.ttl).timestamp(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))
}

/// Validate signature and expiry, returning the claims
pub fn validate_token(keys: &TokenKeys, token: &str) -> Result<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| Error::Auth(format!("Invalid token: {}", e)))
}

/// Load the persisted signing secret, generating one if absent
pub async fn load_signing_secret(db: &SqlitePool) -> Result<String> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_SETTING_KEY)
        .fetch_optional(db)
        .await?;

    match existing {
        Some((value,)) if !value.is_empty() => Ok(value),
        _ => initialize_signing_secret(db).await,
    }
}

/// Generate and store a new random signing secret
pub async fn initialize_signing_secret(db: &SqlitePool) -> Result<String> {
    use rand::RngCore;

    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_SETTING_KEY)
        .bind(&secret)
        .execute(db)
        .await?;

    tracing::info!("Generated new token signing secret");
    Ok(secret)
}

pub mod handlers;
pub mod repository;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a bearer token for `username`. Returns the token and its expiry
/// as a unix timestamp.
pub fn generate_token(username: &str, config: &Config) -> AppResult<(String, i64)> {
    let now = Utc::now().timestamp();
    let exp = now + (config.auth.token_hours as i64) * 3600;

    let claims = Claims {
        sub: username.to_string(),
        iat: now,
        exp,
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign token: {}", e)))?;

    Ok((token, exp))
}

/// Validate a bearer token and return its claims. Any failure (bad
/// signature, expired, malformed) collapses to Unauthorized.
pub fn decode_token(token: &str, config: &Config) -> AppResult<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Fill in a random secret when none is configured. Tokens will not survive
/// a restart in that mode.
pub fn ensure_jwt_secret(config: &mut Config) {
    if config.auth.jwt_secret.is_empty() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        config.auth.jwt_secret = (0..32)
            .map(|_| format!("{:02x}", rng.gen::<u8>()))
            .collect();
        tracing::warn!("No jwt_secret configured; generated an ephemeral one");
    }
}

/// Ownership predicate shared by every service: the resource owner and
/// admins pass, everyone else is rejected.
pub fn require_owner_or_admin(owner_id: &str, user: &CurrentUser) -> AppResult<()> {
    if user.id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have permission to modify this resource".to_string(),
        ))
    }
}

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Header carrying the session nonce
pub const NONCE_HEADER: &str = "x-wp-nonce";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    EditPosts,
    DeletePosts,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::EditPosts => "edit_posts",
            Capability::DeletePosts => "delete_posts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "edit_posts" => Some(Capability::EditPosts),
            "delete_posts" => Some(Capability::DeletePosts),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub caps: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, caps: &[Capability], expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            caps: caps.iter().map(|c| c.as_str().to_string()).collect(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid nonce: {0}")]
    InvalidToken(String),

    #[error("Nonce secret is not configured")]
    MissingSecret,

    #[error("Nonce generation error: {0}")]
    TokenGeneration(String),
}

pub fn issue_nonce(security: &SecurityConfig, user_id: i64, caps: &[Capability]) -> Result<String, AuthError> {
    if security.nonce_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let claims = Claims::new(user_id, caps, security.nonce_expiry_hours);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(security.nonce_secret.as_bytes()))
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn verify_nonce(security: &SecurityConfig, token: &str) -> Result<Claims, AuthError> {
    if security.nonce_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(security.nonce_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Caller identity resolved from the nonce, inserted into request extensions
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user_id: Option<i64>,
    pub caps: Vec<Capability>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: Some(claims.sub),
            // Unknown capability names are ignored
            caps: claims.caps.iter().filter_map(|c| Capability::parse(c)).collect(),
        }
    }
}

//! Shared JWT module for BagichaLink services
//!
//! Tokens are HS256-signed with a single shared secret. The subject claim
//! carries the user id; there is no refresh flow, clients re-authenticate
//! once a token expires.
//!
//! ## Usage
//!
//! Services call `initialize_jwt_secret()` once during startup:
//!
//! ```rust
//! use crypto_core::jwt;
//!
//! jwt::initialize_jwt_secret("change-me", 7).expect("jwt init");
//! let token = jwt::generate_token(uuid::Uuid::new_v4()).unwrap();
//! assert!(jwt::validate_token(&token).is_ok());
//! ```
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, TokenData,
    Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_TOKEN_EXPIRY_DAYS: i64 = 7;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not initialized; call initialize_jwt_secret() during startup")]
    NotInitialized,
    #[error("JWT secret already initialized")]
    AlreadyInitialized,
    #[error("JWT secret must not be empty")]
    EmptySecret,
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to sign token: {0}")]
    Encode(String),
}

/// JWT claims issued by the auth routes
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::Invalid(format!("malformed subject: {e}")))
    }
}

/// Signing material plus token lifetime
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_secret(secret: &str, ttl_days: i64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days.max(1)),
        })
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<TokenData<Claims>, JwtError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

// ============================================================================
// Key Storage
// ============================================================================

static JWT_KEYS: OnceCell<JwtKeys> = OnceCell::new();

/// Initialize the process-wide signing secret.
///
/// Can only succeed once; later calls return `AlreadyInitialized`.
pub fn initialize_jwt_secret(secret: &str, ttl_days: i64) -> Result<(), JwtError> {
    let keys = JwtKeys::from_secret(secret, ttl_days)?;
    JWT_KEYS.set(keys).map_err(|_| JwtError::AlreadyInitialized)?;
    tracing::debug!(ttl_days, "JWT secret initialized");
    Ok(())
}

fn keys() -> Result<&'static JwtKeys, JwtError> {
    JWT_KEYS.get().ok_or(JwtError::NotInitialized)
}

// ============================================================================
// Token Generation / Validation
// ============================================================================

pub fn generate_token(user_id: Uuid) -> Result<String, JwtError> {
    keys()?.issue(user_id)
}

pub fn validate_token(token: &str) -> Result<TokenData<Claims>, JwtError> {
    keys()?.validate(token)
}

/// Validate a token and return the user id it was issued for.
pub fn get_user_id_from_token(token: &str) -> Result<Uuid, JwtError> {
    validate_token(token)?.claims.user_id()
}

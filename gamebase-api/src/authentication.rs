//! Access tokens issued at login and checked on every game server operation.

use base64::{Engine, prelude::BASE64_STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::AuthenticationConfig;
use crate::fleet::Tenant;

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("No bearer token was supplied")]
    MissingToken,

    #[error("The bearer token is invalid: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("No tenant is registered for {0}")]
    UnknownTenant(String),

    #[error("The system clock is set before the UNIX epoch")]
    Clock,
}

/// Claims carried by an access token, `sub` is the tenant's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub iat: u64,
    pub exp: u64,
}

/// Checks bearer tokens.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, AuthenticationError>;
}

/// Issues and verifies HS256 access tokens.
pub struct JwtAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtAuthority {
    pub fn new(secret: &[u8], ttl: Duration) -> JwtAuthority {
        JwtAuthority {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Builds the authority from configuration. A secret that is valid base64 is
    /// decoded, anything else is used as raw bytes.
    pub fn from_config(config: &AuthenticationConfig) -> JwtAuthority {
        let secret = config.jwt_secret.expose_secret();
        let secret = BASE64_STANDARD
            .decode(secret)
            .unwrap_or_else(|_| secret.as_bytes().to_vec());

        JwtAuthority::new(&secret, config.access_token_ttl())
    }

    pub fn issue(&self, tenant: &Tenant) -> Result<String, AuthenticationError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthenticationError::Clock)?
            .as_secs();

        let claims = Claims {
            sub: tenant.email.clone(),
            name: tenant.name.clone(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}

impl TokenVerifier for JwtAuthority {
    fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        Ok(data.claims)
    }
}

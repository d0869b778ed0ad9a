// JWT access token service
// HS256 bearer tokens binding an account id to its role

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccessTokenClaims, Role};

// Error types for JWT operations
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid claims: {0}")]
    InvalidClaims(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtError::InvalidToken(err.to_string()),
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

// JWT configuration with the signing keys derived from one secret
#[derive(Clone)]
pub struct JwtConfig {
    pub access_token_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("access_encoding_key", &"<redacted>")
            .field("access_decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    /// Build JWT config from explicit parameters
    pub fn new(access_secret: &str, access_expiry: u64, audience: &str, issuer: &str) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            algorithm: Algorithm::HS256,
            audience: audience.to_string(),
            issuer: issuer.to_string(),
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
        }
    }

    /// Create JWT config from the loaded application configuration
    pub fn from_app_config(config: &crate::app_config::JwtConfig) -> Self {
        let crate::app_config::JwtConfig {
            access_secret,
            access_expiry,
            audience,
            issuer,
        } = config;

        Self::new(access_secret, *access_expiry, audience, issuer)
    }
}

// JWT service; stateless apart from its keys
#[derive(Debug, Clone)]
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issue an access token for a verified account
    pub fn generate_access_token(&self, account_id: Uuid, role: Role) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::KeyGenerationError(e.to_string()))?
            .as_secs();

        let claims = AccessTokenClaims::new(
            account_id.to_string(),
            role.as_str().to_string(),
            Uuid::new_v4().to_string(),
            self.config.audience.clone(),
            self.config.issuer.clone(),
            now,
            now + self.config.access_token_expiry,
        );

        let header = Header::new(self.config.algorithm);

        encode(&header, &claims, &self.config.access_encoding_key).map_err(Into::into)
    }

    /// Validate signature, audience, issuer and expiry of an access token
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data =
            decode::<AccessTokenClaims>(token, &self.config.access_decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Decode the subject and role carried by validated claims
    pub fn principal(claims: &AccessTokenClaims) -> Result<(Uuid, Role), JwtError> {
        let account_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| JwtError::InvalidClaims("subject is not an account id".to_string()))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| JwtError::InvalidClaims(format!("unknown role '{}'", claims.role)))?;

        Ok((account_id, role))
    }
}

// Authentication models
// Bearer token claims binding an account id to its role

use serde::{Deserialize, Serialize};

/// Access token claims carried by every bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Account ID (subject)
    pub sub: String,

    /// Account role at issue time (super_admin, company_admin, dealer, user)
    pub role: String,

    /// JWT ID (UUID format)
    pub jti: String,

    /// Audience (aud)
    pub aud: String,

    /// Issuer (iss)
    pub iss: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,
}

impl AccessTokenClaims {
    /// Create new access token claims
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: String,
        role: String,
        token_id: String,
        audience: String,
        issuer: String,
        issued_at: u64,
        expires_at: u64,
    ) -> Self {
        Self {
            sub: account_id,
            role,
            jti: token_id,
            aud: audience,
            iss: issuer,
            iat: issued_at,
            exp: expires_at,
        }
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.exp < now
    }
}

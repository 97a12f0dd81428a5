//! Caller identity tokens

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ProvisionerError;
use crate::storage::settings::TokenSettings;

/// Header carrying the caller's token
pub const AUTH_HEADER: &str = "X-Auth";

/// Claims of a caller token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokenClaims {
    /// Identity of the caller
    pub username: String,

    /// Token format version
    pub version: u32,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A decoded caller token
#[derive(Debug, Clone)]
pub struct UserToken {
    /// Raw token string
    pub raw: String,

    /// Decoded claims
    pub claims: UserTokenClaims,
}

impl UserToken {
    /// Decode a caller token (JWT).
    /// Note: This does NOT validate the signature, only decodes the claims
    pub fn from_raw(raw: &str) -> Result<Self, ProvisionerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<UserTokenClaims>(raw, &DecodingKey::from_secret(b""), &validation)
            .map_err(|e| ProvisionerError::AuthError(format!("Failed to decode token: {}", e)))?;

        Ok(Self {
            raw: raw.to_string(),
            claims: token_data.claims,
        })
    }

    /// Decode `raw` and check its version against `settings`
    pub fn verify(raw: &str, settings: &TokenSettings) -> Result<Self, ProvisionerError> {
        let token = Self::from_raw(raw)?;
        let version = token.claims.version;
        if version < settings.min_version || version > settings.max_version {
            return Err(ProvisionerError::AuthError(format!(
                "Unsupported token version {}",
                version
            )));
        }
        if token.claims.username.is_empty() {
            return Err(ProvisionerError::AuthError("Token has no username".to_string()));
        }
        Ok(token)
    }

    pub fn username(&self) -> &str {
        &self.claims.username
    }
}

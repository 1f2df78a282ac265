//! Short-lived signed credentials for the remote API.
//!
//! Every outbound call gets its own HS256 token carrying an admin role claim,
//! the configured audience, subject, and issuer, and a fixed one-minute
//! validity window. A random `jti` keeps two tokens minted within the same
//! second distinct.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workflows::CredentialError;

/// Validity window of a minted token.
pub const TOKEN_LIFETIME_SECONDS: i64 = 60;

/// Role claim granted to the handler's tokens.
const ADMIN_ROLE: &str = "admin";

/// Inputs for minting API tokens.
#[derive(Clone)]
pub struct CredentialConfig {
    /// Shared HS256 secret. Must not be empty.
    pub signing_key: String,
    pub audience: String,
    pub subject: String,
    pub issuer: String,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("signing_key", &"<redacted>")
            .field("audience", &self.audience)
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Claims carried by every minted token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// A signed token, good for exactly one request.
///
/// Not `Clone`. Consumed by [`SignedToken::into_bearer_header`]; `Debug`
/// output is redacted.
pub struct SignedToken(String);

impl SignedToken {
    /// Returns the raw compact JWS.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, producing the `Authorization` header value.
    pub fn into_bearer_header(self) -> String {
        format!("bearer {}", self.0)
    }
}

impl std::fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignedToken(<redacted>)")
    }
}

/// Mints [`SignedToken`]s from a [`CredentialConfig`].
#[derive(Debug, Clone)]
pub struct TokenMinter {
    config: CredentialConfig,
}

impl TokenMinter {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    /// Mints a new token valid from now for [`TOKEN_LIFETIME_SECONDS`].
    pub fn mint(&self) -> Result<SignedToken, CredentialError> {
        if self.config.signing_key.is_empty() {
            return Err(CredentialError::MissingSigningKey);
        }

        let iat = Utc::now().timestamp();
        let claims = AdminClaims {
            role: ADMIN_ROLE.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            sub: self.config.subject.clone(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECONDS,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.signing_key.as_bytes()),
        )
        .map(SignedToken)
        .map_err(|e| CredentialError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn config(key: &str) -> CredentialConfig {
        CredentialConfig {
            signing_key: key.to_string(),
            audience: "api.dev".to_string(),
            subject: "actions-handler".to_string(),
            issuer: "actions-handler".to_string(),
        }
    }

    fn decode_claims(token: &SignedToken, key: &str) -> AdminClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["api.dev"]);
        validation.set_issuer(&["actions-handler"]);
        decode::<AdminClaims>(token.as_str(), &DecodingKey::from_secret(key.as_bytes()), &validation)
            .unwrap()
            .claims
    }

    #[test]
    fn test_mint_carries_configured_claims_and_one_minute_expiry() {
        let minter = TokenMinter::new(config("super-secret-string"));
        let token = minter.mint().unwrap();
        let claims = decode_claims(&token, "super-secret-string");

        assert_eq!(claims.role, "admin");
        assert_eq!(claims.aud, "api.dev");
        assert_eq!(claims.sub, "actions-handler");
        assert_eq!(claims.iss, "actions-handler");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECONDS);
    }

    #[test]
    fn test_consecutive_tokens_differ() {
        let minter = TokenMinter::new(config("super-secret-string"));
        let first = minter.mint().unwrap();
        let second = minter.mint().unwrap();
        assert_ne!(first.as_str(), second.as_str());
        assert_ne!(
            decode_claims(&first, "super-secret-string").jti,
            decode_claims(&second, "super-secret-string").jti
        );
    }

    #[test]
    fn test_token_does_not_verify_with_other_key() {
        let token = TokenMinter::new(config("one")).mint().unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["api.dev"]);
        let result =
            decode::<AdminClaims>(token.as_str(), &DecodingKey::from_secret(b"two"), &validation);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_signing_key_is_rejected() {
        let result = TokenMinter::new(config("")).mint();
        assert!(matches!(result, Err(CredentialError::MissingSigningKey)));
    }

    #[test]
    fn test_bearer_header_format() {
        let token = TokenMinter::new(config("k")).mint().unwrap();
        let raw = token.as_str().to_string();
        assert_eq!(token.into_bearer_header(), format!("bearer {raw}"));
    }
}

//! Identity service: pseudo-anonymous users and signed session tokens.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::repositories::UserRepository;
use crate::error::{AppError, TokenError};

/// Claims carried by a session token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry as Unix seconds.
    pub exp: i64,
    pub user_id: i64,
}

/// Result of checking a structurally valid token.
///
/// `valid` is false for expired tokens and for tokens whose signature does not
/// match; `user_id` then comes from unverified claims and must not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedToken {
    pub user_id: i64,
    pub valid: bool,
}

/// Issues and verifies session tokens and allocates user identities.
///
/// Tokens are HS256 JWTs signed with the server-side secret.
pub struct AuthService<R: UserRepository + ?Sized> {
    repository: Arc<R>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl<R: UserRepository + ?Sized> AuthService<R> {
    /// Creates a new identity service.
    ///
    /// # Arguments
    ///
    /// - `repository` - allocates user ids
    /// - `signing_secret` - HMAC key shared by every instance that must accept the tokens
    /// - `token_ttl` - lifetime of issued tokens
    pub fn new(repository: Arc<R>, signing_secret: String, token_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            repository,
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
            token_ttl,
        }
    }

    /// Issues a token binding `user_id` that expires after the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the token cannot be signed.
    pub fn issue_token(&self, user_id: i64) -> Result<String, TokenError> {
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let exp = Utc::now().timestamp().saturating_add(ttl);
        self.issue_token_with_expiry(user_id, exp)
    }

    fn issue_token_with_expiry(&self, user_id: i64, exp: i64) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            &TokenClaims { exp, user_id },
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies a token's signature and expiry.
    ///
    /// Expired or badly signed tokens are reported through
    /// [`ParsedToken::valid`], not as errors, so callers can fall back to an
    /// anonymous session.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the input is not an `HS256` JWT
    /// carrying `exp` and `user_id` claims.
    pub fn parse_token(&self, token: &str) -> Result<ParsedToken, TokenError> {
        match decode::<TokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(ParsedToken {
                user_id: data.claims.user_id,
                valid: true,
            }),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature | ErrorKind::InvalidSignature => Ok(ParsedToken {
                    user_id: self.unverified_user_id(token),
                    valid: false,
                }),
                _ => Err(TokenError::Malformed(e.to_string())),
            },
        }
    }

    /// Reads `user_id` without checking the signature or expiry.
    fn unverified_user_id(&self, token: &str) -> i64 {
        let mut validation = self.validation.clone();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.user_id)
            .unwrap_or_default()
    }

    /// Allocates a fresh user identity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn create_user_identity(&self) -> Result<i64, AppError> {
        let user_id = self.repository.create_user().await?;
        tracing::info!(user_id, "Created user identity");
        Ok(user_id)
    }
}

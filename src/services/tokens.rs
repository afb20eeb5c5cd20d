//! Signed access/refresh token pairs.
//!
//! Access and refresh tokens are signed with separate secrets so that a leaked
//! key for one class cannot forge tokens of the other.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind, get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
    /// Unique per token, so two pairs minted in the same second still differ.
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }
}

pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &SecurityConfig) -> Self {
        Self::with_secrets(
            config.access_token_secret.as_bytes(),
            config.refresh_token_secret.as_bytes(),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        )
    }

    #[must_use]
    pub fn with_secrets(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_seconds: u64,
        refresh_ttl_seconds: u64,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access: SigningKeys::new(access_secret, access_ttl_seconds),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl_seconds),
            validation,
        }
    }

    const fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Mints both tokens concurrently. Either both are returned or neither.
    pub async fn issue_pair(&self, user_id: &str, email: &str) -> Result<TokenPair, TokenError> {
        let (access_token, refresh_token) = tokio::try_join!(
            async { self.sign(TokenKind::Access, user_id, email) },
            async { self.sign(TokenKind::Refresh, user_id, email) },
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn sign(&self, kind: TokenKind, user_id: &str, email: &str) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let now = get_current_timestamp();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + keys.ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(format!("{} token: {e}", kind.as_str())))
    }

    /// Checks signature and expiry. No store lookup.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::with_secrets(b"access-secret", b"refresh-secret", 900, 604_800)
    }

    #[tokio::test]
    async fn test_issue_pair_claims_and_lifetimes() {
        let issuer = issuer();
        let pair = issuer.issue_pair("user-1", "a@x.com").await.unwrap();

        let access = issuer.verify(TokenKind::Access, &pair.access_token).unwrap();
        assert_eq!(access.sub, "user-1");
        assert_eq!(access.email, "a@x.com");
        assert_eq!(access.exp - access.iat, 900);

        let refresh = issuer
            .verify(TokenKind::Refresh, &pair.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, "user-1");
        assert_eq!(refresh.exp - refresh.iat, 604_800);
    }

    #[tokio::test]
    async fn test_signing_domains_are_separate() {
        let issuer = issuer();
        let pair = issuer.issue_pair("user-1", "a@x.com").await.unwrap();

        assert!(matches!(
            issuer.verify(TokenKind::Access, &pair.refresh_token),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            issuer.verify(TokenKind::Refresh, &pair.access_token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_consecutive_pairs_differ() {
        let issuer = issuer();
        let first = issuer.issue_pair("user-1", "a@x.com").await.unwrap();
        let second = issuer.issue_pair("user-1", "a@x.com").await.unwrap();

        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();
        let now = get_current_timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "a@x.com".to_string(),
            iat: now - 2000,
            exp: now - 1000,
            jti: "old".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(matches!(
            issuer.verify(TokenKind::Access, &token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_garbage_and_foreign_tokens_are_rejected() {
        let issuer = issuer();
        assert!(issuer.verify(TokenKind::Access, "not.a.jwt").is_err());

        let other = TokenIssuer::with_secrets(b"other-access", b"other-refresh", 900, 900);
        let token = other.sign(TokenKind::Access, "user-1", "a@x.com").unwrap();
        assert!(issuer.verify(TokenKind::Access, &token).is_err());
    }
}

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::claims::UserClaims;
use crate::error::Error;

/// Fixed lifetime of minted downstream tokens.
const TOKEN_TTL_SECS: i64 = 3600;

/// Claim set expected by the downstream consumer.
///
/// Registered claims plus the supplementary fields downstream authorization
/// keys on (`role`, `aal`, metadata objects). `sub` echoes the provider
/// subject; `iss`/`aud` belong to the downstream trust domain, not the
/// provider's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    pub aal: String,
    pub app_metadata: JsonValue,
    pub user_metadata: JsonValue,
}

/// Mints HS256 tokens for the downstream trust domain.
///
/// The signing secret is pre-shared with the downstream verifier and has no
/// relationship to the provider's keys — this is a deliberate bridge between
/// trust domains, not a copy of the provider token.
pub struct DownstreamSigner {
    issuer: String,
    audience: String,
    key: EncodingKey,
}

impl DownstreamSigner {
    #[must_use]
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a downstream token for an authenticated user.
    ///
    /// Stateless: every call signs a fresh token with `iat = now` and
    /// `exp = iat + 3600`. Nothing is cached or persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if HMAC signing fails.
    pub fn mint(&self, user: &UserClaims) -> Result<String, Error> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let sub = user.subject.as_str();

        let claims = DownstreamClaims {
            sub: sub.to_owned(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
            email: user.email.clone(),
            role: "authenticated".into(),
            aal: "aal1".into(),
            app_metadata: json!({
                "provider": "keycloak",
                "providers": ["keycloak"],
            }),
            user_metadata: json!({
                "email": user.email,
                "sub": sub,
                "email_verified": true,
            }),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(Into::into)
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Clone)]
struct VerificationKey {
    alg: Algorithm,
    key: DecodingKey,
}

/// Verifies provider-issued id tokens against the provider's published keys.
///
/// Keys are cached by `kid`; an unknown `kid` triggers a single JWKS refetch
/// for the issuing request. Signature, `iss`, `aud` and `exp` are all checked
/// before any claim leaves this type.
pub struct IdTokenVerifier {
    issuer: String,
    audience: String,
    keys: RwLock<HashMap<String, VerificationKey>>,
    jwks: Option<(reqwest::Client, Url)>,
}

impl IdTokenVerifier {
    /// Build a verifier from the provider's JWKS endpoint.
    ///
    /// Fetches the key set once up front; later unknown-`kid` lookups refetch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Token`] if the key set cannot be
    /// fetched or parsed.
    pub async fn from_jwks(
        http: reqwest::Client,
        jwks_uri: Url,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, Error> {
        let keys = fetch_keys(&http, &jwks_uri).await?;
        Ok(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys: RwLock::new(keys),
            jwks: Some((http, jwks_uri)),
        })
    }

    /// Build a verifier around a single known key (no JWKS endpoint).
    ///
    /// Useful for providers with out-of-band key distribution and for
    /// substituting a fake provider in tests.
    #[must_use]
    pub fn with_key(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        kid: impl Into<String>,
        alg: Algorithm,
        key: DecodingKey,
    ) -> Self {
        let keys = HashMap::from([(kid.into(), VerificationKey { alg, key })]);
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            keys: RwLock::new(keys),
            jwks: None,
        }
    }

    /// Verify an id token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the signature, issuer, audience or expiry
    /// check fails, or if no key matches the token's `kid`.
    pub async fn verify(&self, raw: &str) -> Result<JsonValue, Error> {
        let header = decode_header(raw).map_err(|e| Error::Token(e.to_string()))?;

        let key = match self.lookup(header.kid.as_deref()) {
            Some(key) => key,
            None => {
                self.refresh().await?;
                self.lookup(header.kid.as_deref())
                    .ok_or_else(|| Error::Token("no key matches the token kid".into()))?
            }
        };

        if key.alg != header.alg {
            return Err(Error::Token(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(key.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let data = decode::<JsonValue>(raw, &key.key, &validation)
            .map_err(|e| Error::Token(e.to_string()))?;

        Ok(data.claims)
    }

    fn lookup(&self, kid: Option<&str>) -> Option<VerificationKey> {
        let keys = self.keys.read().expect("jwks lock poisoned");
        match kid {
            Some(kid) => keys.get(kid).cloned(),
            // Tokens without a kid are acceptable only when the key is unambiguous.
            None if keys.len() == 1 => keys.values().next().cloned(),
            None => None,
        }
    }

    async fn refresh(&self) -> Result<(), Error> {
        let Some((http, jwks_uri)) = &self.jwks else {
            return Ok(());
        };
        let fresh = fetch_keys(http, jwks_uri).await?;
        *self.keys.write().expect("jwks lock poisoned") = fresh;
        Ok(())
    }
}

async fn fetch_keys(
    http: &reqwest::Client,
    jwks_uri: &Url,
) -> Result<HashMap<String, VerificationKey>, Error> {
    let response = http.get(jwks_uri.clone()).send().await?;
    if !response.status().is_success() {
        return Err(Error::Token(format!(
            "JWKS endpoint returned {}",
            response.status()
        )));
    }

    let document: JwksDocument = response
        .json()
        .await
        .map_err(|e| Error::Token(format!("invalid JWKS document: {e}")))?;

    let mut keys = HashMap::new();
    for jwk in document.keys {
        if jwk.kty != "RSA" {
            continue;
        }
        let alg = match jwk.alg.as_deref() {
            None | Some("RS256") => Algorithm::RS256,
            Some("RS384") => Algorithm::RS384,
            Some("RS512") => Algorithm::RS512,
            Some(_) => continue,
        };
        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            continue;
        };
        let Ok(key) = DecodingKey::from_rsa_components(n, e) else {
            continue;
        };
        if let Some(kid) = jwk.kid.filter(|k| !k.is_empty()) {
            keys.insert(kid, VerificationKey { alg, key });
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &[u8] = b"verifier-test-secret";

    fn hs256_verifier() -> IdTokenVerifier {
        IdTokenVerifier::with_key(
            "https://idp.example.com/realms/app",
            "spa-client",
            "k1",
            Algorithm::HS256,
            DecodingKey::from_secret(SECRET),
        )
    }

    fn sign(claims: &JsonValue, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(String::from);
        encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn valid_claims() -> JsonValue {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        json!({
            "sub": "u1",
            "iss": "https://idp.example.com/realms/app",
            "aud": "spa-client",
            "iat": now,
            "exp": now + 300,
            "name": "A B"
        })
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let token = sign(&valid_claims(), Some("k1"));
        let claims = hs256_verifier().verify(&token).await.unwrap();
        assert_eq!(claims["sub"], "u1");
        assert_eq!(claims["name"], "A B");
    }

    #[tokio::test]
    async fn accepts_kid_less_token_with_single_key() {
        let token = sign(&valid_claims(), None);
        assert!(hs256_verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_issuer() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example.com");
        let token = sign(&claims, Some("k1"));
        let err = hs256_verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let mut claims = valid_claims();
        claims["aud"] = json!("other-client");
        let token = sign(&claims, Some("k1"));
        assert!(hs256_verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let mut claims = valid_claims();
        claims["exp"] = json!(now - 600);
        let token = sign(&claims, Some("k1"));
        assert!(hs256_verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_tampered_signature() {
        let mut token = sign(&valid_claims(), Some("k1"));
        token.pop();
        token.push('A');
        assert!(hs256_verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_kid_without_jwks_source() {
        let token = sign(&valid_claims(), Some("other-kid"));
        let err = hs256_verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }

    #[tokio::test]
    async fn unknown_kid_triggers_one_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [
                    {"kty": "EC", "kid": "ec-key", "crv": "P-256"},
                    {"kty": "RSA", "kid": "incomplete"}
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let jwks_uri: Url = format!("{}/certs", server.uri()).parse().unwrap();
        let verifier = IdTokenVerifier::from_jwks(
            reqwest::Client::new(),
            jwks_uri,
            "https://idp.example.com/realms/app",
            "spa-client",
        )
        .await
        .unwrap();

        // Neither JWKS entry is usable, so verification fails after the refetch.
        let token = sign(&valid_claims(), Some("k1"));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }
}

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::pkce::LoginSecrets;

/// Provider endpoints resolved from the OIDC discovery document.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub jwks_uri: Url,
    #[serde(default)]
    pub end_session_endpoint: Option<Url>,
}

/// Fetch `{issuer}/.well-known/openid-configuration`.
///
/// # Errors
///
/// Returns [`Error::Http`] on network failure and [`Error::Discovery`] if the
/// document cannot be parsed or omits a mandatory endpoint.
pub async fn discover(http: &reqwest::Client, issuer_url: &Url) -> Result<ProviderMetadata, Error> {
    let well_known = format!(
        "{}/.well-known/openid-configuration",
        issuer_url.as_str().trim_end_matches('/')
    );

    let response = http.get(&well_known).send().await?;
    if !response.status().is_success() {
        return Err(Error::Discovery(format!(
            "{well_known} returned {}",
            response.status()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| Error::Discovery(e.to_string()))?;

    if metadata.issuer.trim().is_empty() {
        return Err(Error::Discovery("document is missing the issuer".into()));
    }

    Ok(metadata)
}

/// Token response from the provider's token endpoint.
///
/// Refresh tokens are deliberately not represented — this client never stores
/// or rotates them.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Authorization-code client for the identity provider.
pub struct ProviderClient {
    client_id: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    metadata: ProviderMetadata,
    http: reqwest::Client,
}

impl ProviderClient {
    /// Create a client against resolved provider metadata.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: Url,
        metadata: ProviderMetadata,
        http: reqwest::Client,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
            metadata,
            http,
        }
    }

    /// Override the requested scopes (default: `openid profile email`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Build the authorization redirect URL for one login attempt.
    ///
    /// The caller must persist `secrets.state` and `secrets.code_verifier`
    /// before sending the redirect — the callback is unvalidatable otherwise.
    #[must_use]
    pub fn authorization_url(&self, secrets: &LoginSecrets) -> String {
        let scope = self.scopes.join(" ");

        let mut url = self.metadata.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("state", &secrets.state)
            .append_pair("code_challenge", &secrets.code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("scope", &scope);

        url.into()
    }

    /// Exchange an authorization code for tokens using PKCE.
    ///
    /// Codes are single-use: a failed exchange is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::OAuth`] if the
    /// token endpoint rejects the exchange.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(self.metadata.token_endpoint.clone())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Build the provider end-session URL, if the provider publishes one.
    #[must_use]
    pub fn end_session_url(&self, post_logout_redirect: &Url) -> Option<String> {
        let mut url = self.metadata.end_session_endpoint.clone()?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("post_logout_redirect_uri", post_logout_redirect.as_str());
        Some(url.into())
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

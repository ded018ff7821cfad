use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;

/// Sessions expire with the cookie: 8 hours.
const SESSION_MAX_AGE: time::Duration = time::Duration::hours(8);

/// Trust-domain parameters for minted downstream tokens.
#[derive(Debug, Clone)]
pub struct DownstreamSettings {
    pub(super) secret: String,
    pub(super) issuer: String,
    pub(super) audience: String,
}

impl DownstreamSettings {
    /// Pre-shared secret and issuer are required; the audience defaults to
    /// `authenticated`, the value the reference downstream verifier expects.
    #[must_use]
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: "authenticated".into(),
        }
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }
}

/// Bridge configuration.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors. Use [`from_env()`](BridgeConfig::from_env) for convention-based
/// setup, or [`new()`](BridgeConfig::new) with `with_*` methods for full
/// control.
pub struct BridgeConfig {
    pub(super) client_id: String,
    pub(super) issuer_url: Url,
    pub(super) redirect_uri: Url,
    pub(super) frontend_origin: Url,
    pub(super) scopes: Vec<String>,
    pub(super) cookie_key: Key,
    pub(super) secure_cookies: bool,
    pub(super) session_max_age: time::Duration,
    pub(super) http_timeout: std::time::Duration,
    pub(super) downstream: DownstreamSettings,
}

impl BridgeConfig {
    /// Create config with the required provider and downstream parameters.
    ///
    /// All optional fields use sensible defaults. Override with `with_*`
    /// methods.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        issuer_url: Url,
        redirect_uri: Url,
        frontend_origin: Url,
        downstream: DownstreamSettings,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            issuer_url,
            redirect_uri,
            frontend_origin,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
            cookie_key: Key::generate(),
            secure_cookies: true,
            session_max_age: SESSION_MAX_AGE,
            http_timeout: std::time::Duration::from_secs(10),
            downstream,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OIDC_CLIENT_ID`: OAuth2 client ID
    /// - `OIDC_ISSUER_URL`: provider issuer (discovery base URL)
    /// - `OIDC_REDIRECT_URI`: callback URI registered with the provider
    /// - `FRONTEND_ORIGIN`: SPA origin to return to after login/logout
    /// - `DOWNSTREAM_JWT_SECRET`: pre-shared downstream signing secret
    /// - `DOWNSTREAM_JWT_ISSUER`: issuer claim for minted downstream tokens
    ///
    /// # Optional env vars
    /// - `OIDC_SCOPES`: comma-separated scopes (default `openid,profile,email`)
    /// - `DOWNSTREAM_JWT_AUDIENCE`: audience claim (default `authenticated`)
    /// - `COOKIE_KEY`: cookie encryption key bytes (at least 64)
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable Secure cookies
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs
    /// are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = require_env("OIDC_CLIENT_ID")?;
        let issuer_url = parse_url_env("OIDC_ISSUER_URL")?;
        let redirect_uri = parse_url_env("OIDC_REDIRECT_URI")?;
        let frontend_origin = parse_url_env("FRONTEND_ORIGIN")?;

        let downstream = DownstreamSettings::new(
            require_env("DOWNSTREAM_JWT_SECRET")?,
            require_env("DOWNSTREAM_JWT_ISSUER")?,
        );
        let downstream = match std::env::var("DOWNSTREAM_JWT_AUDIENCE") {
            Ok(audience) => downstream.with_audience(audience),
            Err(_) => downstream,
        };

        let mut config = Self::new(client_id, issuer_url, redirect_uri, frontend_origin, downstream);

        if let Ok(scopes) = std::env::var("OIDC_SCOPES") {
            config = config.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        Ok(config
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    /// SPA origin users are sent back to; also the CORS allow-origin.
    #[must_use]
    pub fn frontend_origin(&self) -> &Url {
        &self.frontend_origin
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_session_max_age(mut self, max_age: time::Duration) -> Self {
        self.session_max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

fn require_env(name: &'static str) -> Result<String, AuthError> {
    std::env::var(name).map_err(|_| AuthError::Config(format!("{name} is required")))
}

fn parse_url_env(name: &'static str) -> Result<Url, AuthError> {
    require_env(name)?
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}

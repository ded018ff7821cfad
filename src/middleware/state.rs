use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use url::Url;

use super::config::BridgeConfig;
use super::error::AuthError;
use super::session::SessionStore;
use crate::downstream::DownstreamSigner;
use crate::provider::{self, ProviderClient, ProviderMetadata};
use crate::verify::IdTokenVerifier;

/// Shared context for the auth handlers, assembled once at startup.
///
/// Every collaborator is resolved at construction time; request handlers only
/// read from this state, so there is no cross-request mutation beyond the
/// verifier's internal key cache.
#[derive(Clone)]
pub struct AuthState {
    pub(super) provider: Arc<ProviderClient>,
    pub(super) verifier: Arc<IdTokenVerifier>,
    pub(super) signer: Arc<DownstreamSigner>,
    pub(super) store: SessionStore,
    pub(super) frontend_origin: Url,
    cookie_key: Key,
}

impl AuthState {
    /// Resolve the provider over the network (discovery + JWKS) and assemble
    /// the state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built or
    /// the provider cannot be resolved.
    pub async fn from_config(config: BridgeConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::Config(e.to_string()))?;

        let metadata = provider::discover(&http, &config.issuer_url)
            .await
            .map_err(|e| AuthError::Config(e.to_string()))?;

        let verifier = IdTokenVerifier::from_jwks(
            http.clone(),
            metadata.jwks_uri.clone(),
            metadata.issuer.clone(),
            config.client_id.clone(),
        )
        .await
        .map_err(|e| AuthError::Config(e.to_string()))?;

        Ok(Self::with_parts(config, metadata, verifier))
    }

    /// Assemble the state from already-resolved collaborators.
    ///
    /// No network traffic until the first code exchange — callers substitute
    /// fake metadata and verifiers here.
    #[must_use]
    pub fn with_parts(
        config: BridgeConfig,
        metadata: ProviderMetadata,
        verifier: IdTokenVerifier,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_default();

        let provider =
            ProviderClient::new(config.client_id, config.redirect_uri, metadata, http)
                .with_scopes(config.scopes);

        let signer = DownstreamSigner::new(
            &config.downstream.secret,
            config.downstream.issuer,
            config.downstream.audience,
        );

        Self {
            provider: Arc::new(provider),
            verifier: Arc::new(verifier),
            signer: Arc::new(signer),
            store: SessionStore::new(config.session_max_age, config.secure_cookies),
            frontend_origin: config.frontend_origin,
            cookie_key: config.cookie_key,
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state.
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

//! Axum layer: routes, cookie session store, configuration and extractors.
//!
//! This module carries the whole HTTP surface of the bridge — the login and
//! callback flow, the credential endpoints and logout — around the protocol
//! primitives at the crate root.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oidc_bridge::middleware::{AuthState, BridgeConfig, auth_routes};
//!
//! // 1. Configure from environment
//! let config = BridgeConfig::from_env()?;
//!
//! // 2. Resolve the provider (discovery + JWKS) and assemble shared state
//! let state = AuthState::from_config(config).await?;
//!
//! // 3. Mount the routes
//! let app = auth_routes(state);
//!
//! // 4. Use the AuthSession extractor in your own handlers
//! async fn whoami(session: oidc_bridge::middleware::AuthSession) -> String {
//!     session.user.subject.to_string()
//! }
//! ```

mod config;
mod error;
mod extractor;
mod routes;
mod session;
mod state;

pub use config::{BridgeConfig, DownstreamSettings};
pub use error::AuthError;
pub use extractor::AuthSession;
pub use routes::auth_routes;
pub use session::SessionRecord;
pub use state::AuthState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;

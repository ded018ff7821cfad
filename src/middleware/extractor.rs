use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use super::state::AuthState;
use crate::claims::UserClaims;

/// Authenticated session extracted from the cookie.
///
/// Use as an Axum extractor in route handlers. Rejects with `401
/// Unauthorized` unless the session carries the durable credentials written
/// by a completed login.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(session: AuthSession) -> impl IntoResponse {
///     format!("subject {}", session.user.subject)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Raw provider bearer token.
    pub access_token: String,
    /// Identity extracted from the verified id token.
    pub user: UserClaims,
}

impl FromRequestParts<AuthState> for AuthSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let record = state.store.load(&jar)?;
        let (access_token, user) = record
            .into_credentials()
            .ok_or(AuthError::Unauthenticated)?;

        Ok(Self { access_token, user })
    }
}

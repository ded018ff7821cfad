use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::error::AuthError;
use crate::claims::UserClaims;
use crate::pkce::LoginSecrets;

pub(super) const SESSION_COOKIE: &str = "auth-session";

/// One-time fields lifted out of the session by the callback.
///
/// Produced by [`SessionRecord::take_pending`]; each field is `None` if the
/// corresponding login step never ran.
#[derive(Debug)]
pub(super) struct PendingLogin {
    pub(super) state: Option<String>,
    pub(super) code_verifier: Option<String>,
}

/// Typed session contents, serialized as JSON into the private cookie.
///
/// Pending fields exist only between `/login` and the callback; durable fields
/// are written together in the callback success path and survive until the
/// next login or logout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_claims: Option<UserClaims>,
}

impl SessionRecord {
    /// Stage a new login attempt. Durable fields from a previous completed
    /// login are left in place until the callback replaces them.
    pub fn begin_login(&mut self, secrets: &LoginSecrets) {
        self.pending_state = Some(secrets.state.clone());
        self.pending_code_verifier = Some(secrets.code_verifier.clone());
    }

    /// Remove and return the pending fields. A second call yields `None`s —
    /// the callback calls this exactly once, before any validation outcome is
    /// known, so replayed callbacks find nothing to validate against.
    pub(super) fn take_pending(&mut self) -> PendingLogin {
        PendingLogin {
            state: self.pending_state.take(),
            code_verifier: self.pending_code_verifier.take(),
        }
    }

    /// Write the durable fields of a validated login.
    pub fn establish(&mut self, access_token: String, user: UserClaims) {
        self.access_token = Some(access_token);
        self.user_claims = Some(user);
    }

    #[must_use]
    pub fn user_claims(&self) -> Option<&UserClaims> {
        self.user_claims.as_ref()
    }

    /// Durable credentials, present only after a validated login.
    pub(super) fn into_credentials(self) -> Option<(String, UserClaims)> {
        Some((self.access_token?, self.user_claims?))
    }
}

/// Narrow interface over the encrypted session cookie.
///
/// The cookie is the only session storage: tamper-evident and confidential via
/// the jar's key, bounded by `max_age`, rewritten wholesale on every save.
#[derive(Debug, Clone)]
pub(super) struct SessionStore {
    max_age: Duration,
    secure: bool,
}

impl SessionStore {
    pub(super) fn new(max_age: Duration, secure: bool) -> Self {
        Self { max_age, secure }
    }

    /// Load the session, failing on a missing, undecryptable or unparseable
    /// cookie. The jar has already rejected tampered values by this point.
    pub(super) fn load(&self, jar: &PrivateCookieJar) -> Result<SessionRecord, AuthError> {
        let cookie = jar.get(SESSION_COOKIE).ok_or(AuthError::Unauthenticated)?;
        serde_json::from_str(cookie.value()).map_err(|_| AuthError::Unauthenticated)
    }

    /// Load the session, or start a fresh record when none exists yet.
    pub(super) fn load_or_default(&self, jar: &PrivateCookieJar) -> SessionRecord {
        self.load(jar).unwrap_or_default()
    }

    /// Serialize the record into the response jar.
    pub(super) fn save(
        &self,
        jar: PrivateCookieJar,
        record: &SessionRecord,
    ) -> Result<PrivateCookieJar, AuthError> {
        let value =
            serde_json::to_string(record).map_err(|e| AuthError::Storage(e.to_string()))?;

        let cookie = Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(self.max_age)
            .build();

        Ok(jar.add(cookie))
    }

    /// Instruct the client to drop the cookie immediately.
    pub(super) fn invalidate(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        let cookie = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .build();
        jar.remove(cookie)
    }
}

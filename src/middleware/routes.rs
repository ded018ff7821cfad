use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;

use super::error::AuthError;
use super::extractor::AuthSession;
use super::session::PendingLogin;
use super::state::AuthState;
use crate::claims::{PublicProfile, UserClaims};
use crate::pkce;

/// Create the authentication router.
pub fn auth_routes(state: AuthState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/auth/session", get(session_profile))
        .route("/auth/token", get(access_token))
        .route(
            "/auth/downstream-token",
            get(downstream_token).post(mint_downstream_token),
        )
        .route("/logout", post(logout))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let secrets = pkce::generate();

    let mut record = state.store.load_or_default(&jar);
    record.begin_login(&secrets);

    // The pending fields ride the same response as the redirect; a failed
    // save aborts the login so the callback never arrives unvalidatable.
    let jar = state.store.save(jar, &record)?;

    let url = state.provider.authorization_url(&secrets);
    Ok((jar, Redirect::to(&url)))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut record = match state.store.load(&jar) {
        Ok(record) => record,
        Err(e) => return e.into_response(),
    };

    // Removed before the outcome is known: success and failure alike persist
    // the record with pending fields gone, so a replay finds nothing to match.
    let pending = record.take_pending();

    match validate_callback(&state, pending, &params).await {
        Ok((access_token, user)) => {
            tracing::info!(subject = %user.subject, "login validated");
            record.establish(access_token, user);
            match state.store.save(jar, &record) {
                Ok(jar) => (jar, Redirect::to(state.frontend_origin.as_str())).into_response(),
                Err(e) => e.into_response(),
            }
        }
        Err(e) => match state.store.save(jar, &record) {
            Ok(jar) => (jar, e).into_response(),
            Err(save_err) => {
                tracing::error!(error = %save_err, "failed to persist cleared login state");
                e.into_response()
            }
        },
    }
}

/// The validation sequence. Any failure is terminal: durable fields are only
/// written by the caller after this returns `Ok`, never partially.
async fn validate_callback(
    state: &AuthState,
    pending: PendingLogin,
    params: &CallbackParams,
) -> Result<(String, UserClaims), AuthError> {
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or("unknown error");
        tracing::warn!(error = %error, description = %description, "provider returned an authorization error");
        return Err(AuthError::ProtocolViolation("authorization error from provider"));
    }

    // State binds the callback to its initiating request. Checked before the
    // authorization code is even looked at.
    let received_state = params.state.as_deref().ok_or(AuthError::StateMismatch)?;
    let expected_state = pending.state.ok_or(AuthError::StateMismatch)?;
    if received_state != expected_state {
        return Err(AuthError::StateMismatch);
    }

    let code_verifier = pending
        .code_verifier
        .ok_or(AuthError::ProtocolViolation("missing code verifier"))?;
    let code = params
        .code
        .as_deref()
        .ok_or(AuthError::ProtocolViolation("missing authorization code"))?;

    // Single attempt: authorization codes and verifiers are one-shot.
    let token = state
        .provider
        .exchange_code(code, &code_verifier)
        .await
        .map_err(AuthError::Exchange)?;

    let raw_id_token = token.id_token.as_deref().ok_or_else(|| {
        AuthError::TokenInvalid(crate::Error::Token("token response carried no id token".into()))
    })?;

    let id_claims = state
        .verifier
        .verify(raw_id_token)
        .await
        .map_err(AuthError::TokenInvalid)?;

    let user = UserClaims::from_id_token(&id_claims).map_err(AuthError::TokenInvalid)?;

    Ok((token.access_token, user))
}

// ── Credentials ────────────────────────────────────────────────────

async fn session_profile(session: AuthSession) -> Json<PublicProfile> {
    Json(PublicProfile::from(&session.user))
}

async fn access_token(session: AuthSession) -> Json<serde_json::Value> {
    Json(json!({ "access_token": session.access_token }))
}

/// Raw provider token in the envelope the alternate downstream consumer
/// expects.
async fn downstream_token(session: AuthSession) -> Json<serde_json::Value> {
    Json(json!({ "access_token": session.access_token, "token_type": "Bearer" }))
}

async fn mint_downstream_token(
    State(state): State<AuthState>,
    session: AuthSession,
) -> Result<Json<serde_json::Value>, AuthError> {
    let token = state
        .signer
        .mint(&session.user)
        .map_err(AuthError::Signing)?;

    tracing::debug!(subject = %session.user.subject, "downstream token minted");
    Ok(Json(json!({ "access_token": token, "token_type": "Bearer" })))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    // Nothing to invalidate means nothing to log out of.
    state.store.load(&jar)?;

    // The removal cookie is attached before the redirect is built, so the
    // local session dies with this response no matter where the browser is
    // sent next.
    let jar = state.store.invalidate(jar);

    let target = state
        .provider
        .end_session_url(&state.frontend_origin)
        .unwrap_or_else(|| state.frontend_origin.as_str().to_owned());

    Ok((jar, Redirect::to(&target)))
}

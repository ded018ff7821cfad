use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the HTTP layer.
///
/// Every failure is terminal for its request: the frontend restarts from
/// `/login`, nothing is retried server-side.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session (missing, undecryptable or unparseable cookie), or a
    /// session without durable credentials.
    #[error("not authenticated")]
    Unauthenticated,

    /// Callback `state` does not match the pending login.
    #[error("state mismatch")]
    StateMismatch,

    /// Callback arrived malformed (provider error, missing code or verifier).
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The authorization-code exchange was rejected or unreachable.
    #[error("token exchange failed: {0}")]
    Exchange(#[source] crate::Error),

    /// The id token failed signature or claim validation.
    #[error("id token rejected: {0}")]
    TokenInvalid(#[source] crate::Error),

    /// The session could not be serialized into the cookie.
    #[error("session store error: {0}")]
    Storage(String),

    /// Downstream token signing failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] crate::Error),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Self::StateMismatch => {
                tracing::warn!("callback rejected: state mismatch");
                (StatusCode::BAD_REQUEST, "Invalid state").into_response()
            }
            Self::ProtocolViolation(detail) => {
                tracing::warn!(detail, "callback rejected");
                (StatusCode::BAD_REQUEST, detail).into_response()
            }
            Self::Exchange(_)
            | Self::TokenInvalid(_)
            | Self::Storage(_)
            | Self::Signing(_)
            | Self::Config(_) => {
                // Details go to the log only; the body stays generic.
                tracing::error!(error = %self, "authentication internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::StateMismatch.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::ProtocolViolation("missing code").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Storage("overflow".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::TokenInvalid(crate::Error::Token("bad aud".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let response = AuthError::Exchange(crate::Error::OAuth {
            operation: "token exchange",
            status: Some(400),
            detail: "secret-ish provider body".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

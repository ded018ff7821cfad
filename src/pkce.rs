use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Per-login secrets binding an authorization request to its callback.
///
/// `state` round-trips through the provider; `code_verifier` stays in the
/// session and is presented at the token endpoint; `code_challenge` is the
/// S256 commitment sent with the authorization request.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LoginSecrets {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
}

/// Generates a fresh state + PKCE pair for one login attempt.
///
/// Each call draws new random bytes — verifiers are single-use. The state is
/// 16 random bytes and the verifier 48 (RFC 7636 compliant, 43-128 chars),
/// both URL-safe base64 without padding.
#[must_use]
pub fn generate() -> LoginSecrets {
    let state_bytes: [u8; 16] = rand::rng().random();
    let verifier_bytes: [u8; 48] = rand::rng().random();

    let code_verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
    let code_challenge = challenge_for(&code_verifier);

    LoginSecrets {
        state: URL_SAFE_NO_PAD.encode(state_bytes),
        code_verifier,
        code_challenge,
    }
}

/// Computes the S256 code challenge for a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_and_charset() {
        let secrets = generate();
        assert_eq!(secrets.code_verifier.len(), 64);
        assert!(
            secrets
                .code_verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier should be URL-safe: {}",
            secrets.code_verifier
        );
    }

    #[test]
    fn test_state_length_and_charset() {
        let secrets = generate();
        assert_eq!(secrets.state.len(), 22);
        assert!(
            secrets
                .state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_secrets_unique_per_call() {
        let a = generate();
        let b = generate();
        assert_ne!(a.code_verifier, b.code_verifier, "verifiers should be unique");
        assert_ne!(a.state, b.state, "states should be unique");
    }

    #[test]
    fn test_challenge_matches_verifier_hash() {
        let secrets = generate();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(secrets.code_verifier.as_bytes()));
        assert_eq!(secrets.code_challenge, expected);
        assert!(!secrets.code_challenge.ends_with('='), "no padding");
    }

    #[test]
    fn test_challenge_deterministic() {
        let c1 = challenge_for("test_verifier_string");
        let c2 = challenge_for("test_verifier_string");
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_challenge_known_vector() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}

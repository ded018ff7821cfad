use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

/// Provider subject identifier (OIDC `sub` claim, opaque string).
///
/// Immutable and unique per identity-provider account. Consumers store this as
/// the sole link to the provider identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Subject(pub String);

impl Subject {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity data extracted once from a verified id token.
///
/// This is the durable projection kept in the session — the raw claim set is
/// not retained. `roles` carries the provider's role claim verbatim, without
/// interpreting its internal shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub subject: Subject,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: JsonValue,
}

impl UserClaims {
    /// Project verified id-token claims into the durable session shape.
    ///
    /// Keeps `sub`, `name`, `email` and the role claim (`realm_access`, or a
    /// top-level `roles` claim for providers that flatten it). Everything else
    /// in the token is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the `sub` claim is missing or not a string.
    pub fn from_id_token(claims: &JsonValue) -> Result<Self, Error> {
        let subject = claims
            .get("sub")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Token("missing claim: sub".into()))?;

        let roles = claims
            .get("realm_access")
            .or_else(|| claims.get("roles"))
            .cloned()
            .unwrap_or(JsonValue::Null);

        Ok(Self {
            subject: Subject::from(subject),
            name: claims.get("name").and_then(JsonValue::as_str).map(String::from),
            email: claims.get("email").and_then(JsonValue::as_str).map(String::from),
            roles,
        })
    }
}

/// Allow-listed profile view served to the frontend.
///
/// Exactly these four fields — claims the id token carried beyond them never
/// reach the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Subject,
    pub roles: JsonValue,
}

impl From<&UserClaims> for PublicProfile {
    fn from(user: &UserClaims) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            subject: user.subject.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_keycloak_shaped_claims() {
        let claims = json!({
            "sub": "u1",
            "name": "A B",
            "email": "a@b.com",
            "realm_access": {"roles": ["viewer"]},
            "nonce": "abc",
            "azp": "frontend"
        });

        let user = UserClaims::from_id_token(&claims).unwrap();
        assert_eq!(user.subject.as_str(), "u1");
        assert_eq!(user.name.as_deref(), Some("A B"));
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
        assert_eq!(user.roles, json!({"roles": ["viewer"]}));
    }

    #[test]
    fn falls_back_to_flat_roles_claim() {
        let claims = json!({"sub": "u1", "roles": ["viewer"]});
        let user = UserClaims::from_id_token(&claims).unwrap();
        assert_eq!(user.roles, json!(["viewer"]));
    }

    #[test]
    fn missing_optional_claims_are_none() {
        let user = UserClaims::from_id_token(&json!({"sub": "u1"})).unwrap();
        assert_eq!(user.name, None);
        assert_eq!(user.email, None);
        assert_eq!(user.roles, JsonValue::Null);
    }

    #[test]
    fn missing_sub_is_an_error() {
        assert!(UserClaims::from_id_token(&json!({"name": "A B"})).is_err());
        assert!(UserClaims::from_id_token(&json!({"sub": ""})).is_err());
        assert!(UserClaims::from_id_token(&json!({"sub": 42})).is_err());
    }

    #[test]
    fn profile_serializes_exactly_four_keys() {
        let claims = json!({
            "sub": "u1",
            "name": "A B",
            "email": "a@b.com",
            "roles": ["viewer"],
            "nonce": "should-not-leak"
        });
        let user = UserClaims::from_id_token(&claims).unwrap();
        let profile = PublicProfile::from(&user);

        let value = serde_json::to_value(&profile).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(
            value,
            json!({"name": "A B", "email": "a@b.com", "subject": "u1", "roles": ["viewer"]})
        );
    }

    #[test]
    fn user_claims_serde_roundtrip() {
        let user = UserClaims {
            subject: Subject::from("u1"),
            name: Some("A B".into()),
            email: None,
            roles: json!(["viewer"]),
        };
        let encoded = serde_json::to_string(&user).unwrap();
        let decoded: UserClaims = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, user);
    }
}

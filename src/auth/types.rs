use serde::{Deserialize, Serialize};

/// Claims the service reads from the caller's bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Per-request caller identity, inserted by the auth middleware
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    /// Store-facing user id derived from the token subject
    pub user_id: String,
    /// Raw `Authorization` header, forwarded to every backend call
    pub authorization: String,
}

impl AuthContext {
    pub fn from_claims(claims: &AuthClaims, authorization: impl Into<String>) -> Self {
        Self {
            user_id: normalize_user_id(&claims.sub),
            authorization: authorization.into(),
        }
    }
}

/// Identity-provider subjects look like `auth0|abc`; the stores key on `auth0-abc`
pub fn normalize_user_id(subject: &str) -> String {
    subject.replace('|', "-")
}

//! Normalized AWS credentials.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Temporary AWS credentials returned by a metadata service.
///
/// Values returned by this library always have a non-empty `access_key_id` and
/// `secret_access_key`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credential {
    /// The value of `AWS_ACCESS_KEY_ID`.
    pub access_key_id: String,
    /// The value of `AWS_SECRET_ACCESS_KEY`.
    pub secret_access_key: String,
    /// The value of `AWS_SESSION_TOKEN`.
    #[serde(rename = "Token", skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// When these credentials stop working.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a new credential.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration,
        }
    }

    /// Will this credential have expired by `when`? Credentials without an
    /// expiration never expire.
    pub fn expires_before(&self, when: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration < when)
    }
}

// Keep secrets out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

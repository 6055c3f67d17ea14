//! Decoding the JSON documents returned by metadata services.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::credential::Credential;

/// An error decoding a credential document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Malformed JSON, a missing field, or a badly formatted date.
    #[error("invalid credential document: {0}")]
    Json(#[from] serde_json::Error),
    /// A field was present but empty, which would leave us with unusable
    /// credentials.
    #[error("credential document has empty {0}")]
    EmptyField(&'static str),
}

/// The date format used by both metadata services, for example
/// `2025-06-15T12:30:45Z`. Always UTC.
pub mod metadata_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// A `chrono` format string for metadata dates.
    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    /// Parse a metadata date.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        Ok(NaiveDateTime::parse_from_str(s, FORMAT)?.and_utc())
    }

    /// Format a metadata date.
    pub fn format(date: &DateTime<Utc>) -> String {
        date.format(FORMAT).to_string()
    }

    /// Serialize a date for use with `#[serde(with = "metadata_date")]`.
    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(date))
    }

    /// Deserialize a date for use with `#[serde(with = "metadata_date")]`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(|err| {
            de::Error::custom(format!("invalid metadata date {:?}: {}", s, err))
        })
    }
}

mod private {
    pub trait Sealed {}
}

/// A JSON document shape returned by one of our metadata services.
///
/// This is sealed, because we only know about two services.
pub trait MetaDataShape: DeserializeOwned + private::Sealed {
    /// Project this document onto a [`Credential`].
    fn into_credential(self) -> Credential;
}

/// Credentials returned by the ECS container credentials endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct EcsMetaData {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    #[serde(with = "metadata_date")]
    pub expiration: DateTime<Utc>,
    pub role_arn: String,
}

impl private::Sealed for EcsMetaData {}

impl fmt::Debug for EcsMetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcsMetaData")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("role_arn", &self.role_arn)
            .finish()
    }
}

impl MetaDataShape for EcsMetaData {
    fn into_credential(self) -> Credential {
        Credential::new(
            self.access_key_id,
            self.secret_access_key,
            Some(self.token),
            Some(self.expiration),
        )
    }
}

/// Credentials returned by the EC2 instance metadata service.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct InstanceMetaData {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: String,
    #[serde(with = "metadata_date")]
    pub expiration: DateTime<Utc>,
    pub code: String,
    #[serde(with = "metadata_date")]
    pub last_updated: DateTime<Utc>,
    #[serde(rename = "Type")]
    pub credential_type: String,
}

impl private::Sealed for InstanceMetaData {}

impl fmt::Debug for InstanceMetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceMetaData")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("code", &self.code)
            .field("last_updated", &self.last_updated)
            .field("credential_type", &self.credential_type)
            .finish()
    }
}

impl MetaDataShape for InstanceMetaData {
    fn into_credential(self) -> Credential {
        Credential::new(
            self.access_key_id,
            self.secret_access_key,
            Some(self.token),
            Some(self.expiration),
        )
    }
}

/// Decode `body` as a `Shape` document and convert it to a [`Credential`].
pub fn decode<Shape: MetaDataShape>(body: &[u8]) -> Result<Credential, DecodeError> {
    let metadata = serde_json::from_slice::<Shape>(body).map_err(|err| {
        debug!("failed to decode credentials: {}", err);
        err
    })?;
    let credential = metadata.into_credential();
    if credential.access_key_id.is_empty() {
        return Err(DecodeError::EmptyField("AccessKeyId"));
    }
    if credential.secret_access_key.is_empty() {
        return Err(DecodeError::EmptyField("SecretAccessKey"));
    }
    info!(
        "found credentials with access key {}",
        credential.access_key_id
    );
    Ok(credential)
}

//! Errors returned while looking up credentials.

use std::{result, time::Duration};

use http::StatusCode;
use thiserror::Error;

use crate::{decode::DecodeError, requester::TransportError};

/// The result type of this library.
pub type Result<T, E = MetadataError> = result::Result<T, E>;

/// An error that prevented us from returning a [`crate::Credential`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetadataError {
    /// A required configuration value was missing or empty.
    #[error("missing required parameter {0}")]
    MissingRequiredParam(String),

    /// The instance metadata service would not tell us our role name.
    #[error("could not get instance role name from the instance metadata service")]
    CouldNotGetInstanceRoleName,

    /// The instance metadata service refused to return credentials for our role.
    #[error("could not get instance metadata credentials (HTTP status {status})")]
    CouldNotGetInstanceMetadata {
        /// The HTTP status returned by the credential endpoint.
        status: StatusCode,
    },

    /// We could not talk to the metadata service at all.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The metadata service returned something we could not use.
    #[error("could not decode credentials: {0}")]
    Decode(#[from] DecodeError),

    /// An environment variable was set, but it was not valid Unicode.
    #[error("environment variable {0} cannot be converted to UTF-8")]
    EnvVarNotUnicode(String),

    /// The caller cancelled the lookup.
    #[error("credential lookup was cancelled")]
    Cancelled,

    /// The lookup did not finish before the configured deadline.
    #[error("credential lookup did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

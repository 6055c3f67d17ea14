//! Discover temporary AWS credentials from the link-local metadata services
//! available to containers and virtual machines.
//!
//! This is intended for programs that need to sign AWS requests but which do
//! not have any static secrets configured. It knows how to talk to two
//! services:
//!
//! - The ECS container credentials endpoint at `169.254.170.2`, used whenever
//!   `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is set.
//! - The EC2 instance metadata service (IMDS) at `169.254.169.254`, used
//!   otherwise. We try the IMDSv2 token handshake first, and fall back to
//!   IMDSv1-style requests if no token is available.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> Result<(), aws_metadata_credentials::MetadataError> {
//! let credential = aws_metadata_credentials::get_credential().await?;
//! println!("using access key {}", credential.access_key_id);
//! # Ok(())
//! # }
//! ```
//!
//! For more control, build a [`MetadataConfig`], wrap it in a
//! [`MetadataService`], and supply your own [`HttpRequester`].
//!
//! ## What this library does not do
//!
//! Credentials are not cached or refreshed. Each call to
//! [`MetadataService::get_credential`] performs a fresh lookup, and callers
//! are expected to hang onto the result until [`Credential::expiration`].

pub use crate::{
    config::MetadataConfig,
    credential::Credential,
    decode::{decode, metadata_date, DecodeError, EcsMetaData, InstanceMetaData, MetaDataShape},
    errors::MetadataError,
    requester::{HttpRequest, HttpRequester, HttpResponse, ReqwestRequester, TransportError},
    service::MetadataService,
    sources::{CredentialSource, EcsSource, InstanceMetadataSource},
};

mod config;
mod credential;
mod decode;
mod errors;
mod requester;
mod service;
mod sources;
#[cfg(test)]
mod test_support;

/// Look up credentials using the process environment and the default HTTP
/// client.
pub async fn get_credential() -> Result<Credential, MetadataError> {
    MetadataService::from_env()?
        .get_credential(&ReqwestRequester::default())
        .await
}

//! The places we know how to find credentials.

use tracing::instrument;

use crate::{
    config::MetadataConfig, credential::Credential, errors::Result, requester::HttpRequester,
};

pub use self::{ecs::EcsSource, instance_metadata::InstanceMetadataSource};

mod ecs;
mod instance_metadata;

/// A metadata service which can supply credentials.
///
/// There are only two of these, so this is a closed `enum` rather than a
/// trait.
#[derive(Clone, Debug)]
pub enum CredentialSource {
    /// The ECS container credentials endpoint.
    Ecs(EcsSource),
    /// The EC2 instance metadata service.
    InstanceMetadata(InstanceMetadataSource),
}

impl CredentialSource {
    /// Choose a source based on `config`. If an ECS relative URI is configured,
    /// we use ECS. Otherwise we use the instance metadata service.
    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        match config.ecs_credentials_uri() {
            Some(uri) => Ok(Self::Ecs(EcsSource::new(uri, config.request_timeout)?)),
            None => Ok(Self::InstanceMetadata(InstanceMetadataSource::new(config))),
        }
    }

    /// Fetch credentials from this source. Errors are returned as-is: we never
    /// fall back from one source to the other.
    #[instrument(level = "debug", skip(requester))]
    pub async fn get_credential(
        &self,
        requester: &dyn HttpRequester,
    ) -> Result<Credential> {
        match self {
            Self::Ecs(source) => source.get_credential(requester).await,
            Self::InstanceMetadata(source) => source.get_credential(requester).await,
        }
    }
}

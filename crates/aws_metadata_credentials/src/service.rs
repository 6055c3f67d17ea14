//! The main entry point: pick a credential source and ask it for credentials.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    config::MetadataConfig,
    credential::Credential,
    errors::{MetadataError, Result},
    requester::HttpRequester,
    sources::CredentialSource,
};

/// Looks up credentials from whichever metadata service is appropriate.
#[derive(Clone, Debug, Default)]
pub struct MetadataService {
    config: MetadataConfig,
}

impl MetadataService {
    /// Create a new service using `config`.
    pub fn new(config: MetadataConfig) -> Self {
        Self { config }
    }

    /// Create a new service configured from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(MetadataConfig::from_env()?))
    }

    /// Our configuration.
    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// The credential source we would use.
    pub fn source(&self) -> Result<CredentialSource> {
        CredentialSource::from_config(&self.config)
    }

    /// Look up credentials, giving up if `config.deadline` passes.
    #[instrument(level = "debug", skip_all)]
    pub async fn get_credential(
        &self,
        requester: &dyn HttpRequester,
    ) -> Result<Credential> {
        let source = self.source()?;
        debug!("using credential source {:?}", source);
        match self.config.deadline {
            Some(deadline) => {
                tokio::time::timeout(deadline, source.get_credential(requester))
                    .await
                    .map_err(|_| MetadataError::DeadlineExceeded(deadline))?
            }
            None => source.get_credential(requester).await,
        }
    }

    /// Like [`Self::get_credential`], but stop as soon as `cancel` is
    /// cancelled. Any in-flight request is dropped, closing its connection.
    pub async fn get_credential_with_cancellation(
        &self,
        requester: &dyn HttpRequester,
        cancel: CancellationToken,
    ) -> Result<Credential> {
        tokio::select! {
            result = self.get_credential(requester) => result,
            () = cancel.cancelled() => {
                debug!("credential lookup cancelled");
                Err(MetadataError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        requester::{HttpResponse, TransportError},
        test_support::ScriptedRequester,
    };

    const ECS_JSON: &str = r#"{"AccessKeyId":"ASIAECS","SecretAccessKey":"ecs-secret","Token":"ecs-token","Expiration":"2025-06-15T12:30:45Z","RoleArn":"arn:aws:iam::123456789012:role/task"}"#;

    fn ecs_config(relative_uri: &str) -> MetadataConfig {
        MetadataConfig::default().container_credentials_relative_uri(Some(relative_uri.to_owned()))
    }

    #[test]
    fn selects_instance_metadata_without_ecs_variable() {
        for relative_uri in [None, Some(String::new())] {
            let config = MetadataConfig::default().container_credentials_relative_uri(relative_uri);
            let source = MetadataService::new(config).source().unwrap();
            assert!(matches!(source, CredentialSource::InstanceMetadata(_)));
        }
    }

    #[test]
    fn selects_ecs_with_ecs_variable() {
        let service = MetadataService::new(ecs_config("/v2/credentials/abc123"));
        match service.source().unwrap() {
            CredentialSource::Ecs(source) => {
                assert_eq!(source.uri(), "http://169.254.170.2/v2/credentials/abc123")
            }
            other => panic!("expected ECS source, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ecs_lookup_makes_a_single_request() {
        let uri = "http://169.254.170.2/v2/credentials/abc123";
        let requester = ScriptedRequester::new().respond(
            Method::GET,
            uri,
            HttpResponse::new(StatusCode::OK, ECS_JSON),
        );
        let service = MetadataService::new(ecs_config("/v2/credentials/abc123"));
        let credential = service.get_credential(&requester).await.unwrap();
        assert_eq!(credential.access_key_id, "ASIAECS");

        let requests = requester.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].uri, uri);
    }

    #[tokio::test]
    async fn ecs_failure_does_not_fall_back_to_imds() {
        let uri = "http://169.254.170.2/v2/credentials/abc123";
        let requester = ScriptedRequester::new().fail(
            Method::GET,
            uri,
            TransportError::TimedOut {
                uri: uri.to_owned(),
            },
        );
        let service = MetadataService::new(ecs_config("/v2/credentials/abc123"));
        let err = service.get_credential(&requester).await.unwrap_err();
        assert!(matches!(err, MetadataError::Transport(_)));
        assert_eq!(requester.requests().len(), 1);
    }

    #[tokio::test]
    async fn deadline_bounds_the_whole_lookup() {
        let uri = "http://169.254.170.2/v2/credentials/abc123";
        let requester = ScriptedRequester::new().hang(Method::GET, uri);
        let config = ecs_config("/v2/credentials/abc123")
            .deadline(Some(Duration::from_millis(50)));
        let err = MetadataService::new(config)
            .get_credential(&requester)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_the_lookup() {
        let requester = ScriptedRequester::new()
            .hang(Method::PUT, "http://169.254.169.254/latest/api/token");
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let err = MetadataService::default()
            .get_credential_with_cancellation(&requester, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Cancelled));
        assert_eq!(requester.requests().len(), 1);
    }
}

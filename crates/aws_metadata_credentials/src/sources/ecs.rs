//! Credentials for ECS tasks.

use std::time::Duration;

use http::Method;
use tracing::debug;

use crate::{
    config::CONTAINER_CREDENTIALS_RELATIVE_URI,
    credential::Credential,
    decode::{decode, EcsMetaData},
    errors::{MetadataError, Result},
    requester::{HttpRequest, HttpRequester},
};

/// Fetches credentials from the ECS container credentials endpoint with a
/// single `GET`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcsSource {
    uri: String,
    timeout: Duration,
}

impl EcsSource {
    /// Create a source which fetches credentials from `uri`.
    pub fn new(uri: impl Into<String>, timeout: Duration) -> Result<Self> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(MetadataError::MissingRequiredParam(
                CONTAINER_CREDENTIALS_RELATIVE_URI.to_owned(),
            ));
        }
        Ok(Self { uri, timeout })
    }

    /// The URI we fetch credentials from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Fetch credentials.
    pub async fn get_credential(
        &self,
        requester: &dyn HttpRequester,
    ) -> Result<Credential> {
        debug!("requesting ECS credentials");
        let response = requester
            .send(HttpRequest::new(Method::GET, &self.uri, self.timeout))
            .await?;
        debug!("ECS credentials endpoint returned {}", response.status);
        Ok(decode::<EcsMetaData>(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        requester::{HttpResponse, TransportError},
        test_support::ScriptedRequester,
    };

    const URI: &str = "http://169.254.170.2/v2/credentials/abc123";

    const ECS_JSON: &str = r#"{"AccessKeyId":"ASIAECS","SecretAccessKey":"ecs-secret","Token":"ecs-token","Expiration":"2025-06-15T12:30:45Z","RoleArn":"arn:aws:iam::123456789012:role/task"}"#;

    fn source() -> EcsSource {
        EcsSource::new(URI, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn empty_uri_is_rejected() {
        let err = EcsSource::new("", Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, MetadataError::MissingRequiredParam(_)));
    }

    #[tokio::test]
    async fn fetches_credentials_with_one_get() {
        let requester = ScriptedRequester::new()
            .respond(Method::GET, URI, HttpResponse::new(StatusCode::OK, ECS_JSON));
        let credential = source().get_credential(&requester).await.unwrap();
        assert_eq!(credential.access_key_id, "ASIAECS");

        let requests = requester.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].uri, URI);
        assert!(requests[0].headers.is_empty());
        assert_eq!(requests[0].timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let requester = ScriptedRequester::new().respond(
            Method::GET,
            URI,
            HttpResponse::new(StatusCode::OK, r#"{"AccessKeyId":"ASIAECS"}"#),
        );
        let err = source().get_credential(&requester).await.unwrap_err();
        assert!(matches!(err, MetadataError::Decode(_)));
    }

    #[tokio::test]
    async fn transport_errors_propagate_without_retry() {
        let requester = ScriptedRequester::new().fail(
            Method::GET,
            URI,
            TransportError::TimedOut {
                uri: URI.to_owned(),
            },
        );
        let err = source().get_credential(&requester).await.unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Transport(TransportError::TimedOut { .. })
        ));
        assert_eq!(requester.requests().len(), 1);
    }
}

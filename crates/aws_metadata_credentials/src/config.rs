//! Where to find our metadata services, and how long to wait for them.

use std::{env, time::Duration};

use crate::errors::{MetadataError, Result};

/// The environment variable that tells us we're running in an ECS task.
pub(crate) const CONTAINER_CREDENTIALS_RELATIVE_URI: &str =
    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

/// Configuration for [`crate::MetadataService`].
///
/// The defaults match the real AWS endpoints. Endpoints may be overridden to
/// point at a local mock server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataConfig {
    pub(crate) ecs_endpoint: String,
    pub(crate) imds_endpoint: String,
    pub(crate) container_credentials_relative_uri: Option<String>,
    pub(crate) request_timeout: Duration,
    pub(crate) token_ttl_seconds: u32,
    pub(crate) deadline: Option<Duration>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            ecs_endpoint: "http://169.254.170.2".to_owned(),
            imds_endpoint: "http://169.254.169.254".to_owned(),
            container_credentials_relative_uri: None,
            request_timeout: Duration::from_secs(2),
            token_ttl_seconds: 21600,
            deadline: None,
        }
    }
}

impl MetadataConfig {
    /// Build a configuration from the process environment. This reads
    /// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` exactly once.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(..)) => {
                Err(MetadataError::EnvVarNotUnicode(name.to_owned()))
            }
        })
    }

    /// Build a configuration using `lookup` to read environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        let relative_uri = lookup(CONTAINER_CREDENTIALS_RELATIVE_URI)?
            .filter(|uri| !uri.is_empty());
        Ok(Self::default().container_credentials_relative_uri(relative_uri))
    }

    /// Set the ECS credentials endpoint, without a trailing slash.
    pub fn ecs_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ecs_endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the instance metadata endpoint, without a trailing slash.
    pub fn imds_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.imds_endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Set the ECS relative credentials path. `None` or an empty string
    /// selects the instance metadata service instead.
    pub fn container_credentials_relative_uri(mut self, uri: Option<String>) -> Self {
        self.container_credentials_relative_uri = uri.filter(|uri| !uri.is_empty());
        self
    }

    /// Set the timeout for each individual HTTP request.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how long IMDSv2 session tokens should last.
    pub fn token_ttl_seconds(mut self, seconds: u32) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    /// Set an overall time limit for a credential lookup.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The full ECS credentials URI, if we're configured to use ECS.
    pub fn ecs_credentials_uri(&self) -> Option<String> {
        self.container_credentials_relative_uri
            .as_ref()
            .map(|relative| format!("{}{}", self.ecs_endpoint, relative))
    }

    pub(crate) fn imds_token_uri(&self) -> String {
        format!("{}/latest/api/token", self.imds_endpoint)
    }

    pub(crate) fn imds_role_list_uri(&self) -> String {
        format!("{}/latest/meta-data/iam/security-credentials/", self.imds_endpoint)
    }
}

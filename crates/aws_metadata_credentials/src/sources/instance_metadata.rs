//! Credentials for EC2 instances, via the instance metadata service (IMDS).
//!
//! Getting credentials takes up to three requests:
//!
//! 1. `PUT /latest/api/token` to get an IMDSv2 session token. Older platforms
//!    don't support this, and containers may be blocked from it by the PUT
//!    hop limit, so if it fails we carry on without a token (IMDSv1).
//! 2. `GET /latest/meta-data/iam/security-credentials/` to find our role.
//! 3. `GET /latest/meta-data/iam/security-credentials/{role}` to get
//!    credentials for that role.
//!
//! We model this as a small state machine, so that the one place we swallow
//! an error is easy to find.

use std::{fmt, time::Duration};

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tracing::{debug, trace};

use crate::{
    config::MetadataConfig,
    credential::Credential,
    decode::{decode, InstanceMetaData},
    errors::{MetadataError, Result},
    requester::{HttpRequest, HttpRequester},
};

/// Header used to request a session token with a given lifetime.
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";

/// Header used to pass a session token to IMDS.
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";

/// An IMDSv2 session token, if we managed to get one. This only lives as long
/// as a single call to [`InstanceMetadataSource::get_credential`].
#[derive(Clone, Default, PartialEq, Eq)]
struct SessionHeader {
    token: Option<HeaderValue>,
}

impl SessionHeader {
    /// Build the headers to send along with a metadata request.
    fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            headers.insert(TOKEN_HEADER, token.clone());
        }
        headers
    }
}

impl fmt::Debug for SessionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Some(_) => write!(f, "SessionHeader(<redacted>)"),
            None => write!(f, "SessionHeader(none)"),
        }
    }
}

/// Where we are in the process of fetching credentials. Failure is represented
/// by returning an error from [`InstanceMetadataSource::step`].
enum ImdsState {
    /// Nothing has happened yet.
    Init,
    /// We've tried to get a session token.
    TokenRequested { session: SessionHeader },
    /// We know our role name.
    RoleRequested {
        session: SessionHeader,
        role_name: String,
    },
    /// We have a credential document to decode.
    CredentialRequested { body: Bytes },
    /// We're finished.
    Done(Credential),
}

// The credential document contains our secret key, so only show its length.
impl fmt::Debug for ImdsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImdsState::Init => write!(f, "Init"),
            ImdsState::TokenRequested { session } => f
                .debug_struct("TokenRequested")
                .field("session", session)
                .finish(),
            ImdsState::RoleRequested { session, role_name } => f
                .debug_struct("RoleRequested")
                .field("session", session)
                .field("role_name", role_name)
                .finish(),
            ImdsState::CredentialRequested { body } => f
                .debug_struct("CredentialRequested")
                .field("body_len", &body.len())
                .finish(),
            ImdsState::Done(credential) => f.debug_tuple("Done").field(credential).finish(),
        }
    }
}

/// Fetches credentials from the EC2 instance metadata service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceMetadataSource {
    token_uri: String,
    role_list_uri: String,
    token_ttl_seconds: u32,
    timeout: Duration,
}

impl InstanceMetadataSource {
    /// Create a new source using the endpoints in `config`.
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            token_uri: config.imds_token_uri(),
            role_list_uri: config.imds_role_list_uri(),
            token_ttl_seconds: config.token_ttl_seconds,
            timeout: config.request_timeout,
        }
    }

    /// Fetch credentials by running our state machine to completion.
    pub async fn get_credential(
        &self,
        requester: &dyn HttpRequester,
    ) -> Result<Credential> {
        let mut state = ImdsState::Init;
        loop {
            state = match self.step(state, requester).await? {
                ImdsState::Done(credential) => return Ok(credential),
                next => next,
            };
        }
    }

    /// Advance our state machine by one step.
    async fn step(
        &self,
        state: ImdsState,
        requester: &dyn HttpRequester,
    ) -> Result<ImdsState> {
        trace!("IMDS state: {:?}", state);
        match state {
            ImdsState::Init => {
                let session = self.request_token(requester).await;
                Ok(ImdsState::TokenRequested { session })
            }
            ImdsState::TokenRequested { session } => {
                let role_name = self.request_role_name(requester, &session).await?;
                Ok(ImdsState::RoleRequested { session, role_name })
            }
            ImdsState::RoleRequested { session, role_name } => {
                let body = self
                    .request_credential(requester, &session, &role_name)
                    .await?;
                Ok(ImdsState::CredentialRequested { body })
            }
            ImdsState::CredentialRequested { body } => {
                Ok(ImdsState::Done(decode::<InstanceMetaData>(&body)?))
            }
            ImdsState::Done(credential) => Ok(ImdsState::Done(credential)),
        }
    }

    /// Try to get an IMDSv2 session token. This never fails: if we can't get
    /// a token, we return an empty [`SessionHeader`] and use IMDSv1.
    async fn request_token(&self, requester: &dyn HttpRequester) -> SessionHeader {
        debug!("requesting IMDS session token");
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_TTL_HEADER, HeaderValue::from(self.token_ttl_seconds));
        let request =
            HttpRequest::new(Method::PUT, &self.token_uri, self.timeout).headers(headers);
        let token = match requester.send(request).await {
            Ok(response) if response.status == StatusCode::OK => response
                .body_utf8()
                .and_then(|token| HeaderValue::from_str(token).ok())
                .map(|mut token| {
                    token.set_sensitive(true);
                    token
                }),
            Ok(response) => {
                debug!("IMDS token request returned {}", response.status);
                None
            }
            Err(err) => {
                debug!("IMDS token request failed: {}", err);
                None
            }
        };
        if token.is_none() {
            debug!("no IMDS session token, falling back to IMDSv1");
        }
        SessionHeader { token }
    }

    /// Ask IMDS for the name of our instance role.
    async fn request_role_name(
        &self,
        requester: &dyn HttpRequester,
        session: &SessionHeader,
    ) -> Result<String> {
        debug!("requesting IMDS role name");
        let request = HttpRequest::new(Method::GET, &self.role_list_uri, self.timeout)
            .headers(session.to_headers());
        let response = requester.send(request).await?;
        match response.body_utf8() {
            Some(role_name) if response.status == StatusCode::OK && !role_name.is_empty() => {
                debug!("instance role name: {}", role_name);
                Ok(role_name.to_owned())
            }
            _ => {
                debug!("failed to get instance role name ({})", response.status);
                Err(MetadataError::CouldNotGetInstanceRoleName)
            }
        }
    }

    /// Ask IMDS for the credentials associated with `role_name`.
    async fn request_credential(
        &self,
        requester: &dyn HttpRequester,
        session: &SessionHeader,
        role_name: &str,
    ) -> Result<Bytes> {
        debug!("requesting IMDS credentials");
        let uri = format!("{}/{}", self.role_list_uri.trim_end_matches('/'), role_name);
        let request =
            HttpRequest::new(Method::GET, uri, self.timeout).headers(session.to_headers());
        let response = requester.send(request).await?;
        if response.status != StatusCode::OK {
            debug!("failed to get instance metadata ({})", response.status);
            return Err(MetadataError::CouldNotGetInstanceMetadata {
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

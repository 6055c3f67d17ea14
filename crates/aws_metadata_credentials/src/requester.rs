//! The one-shot HTTP transport used to talk to metadata services.
//!
//! Metadata services live on link-local addresses, so we never need TLS,
//! proxies or connection reuse. Every request gets its own short-lived
//! connection, which is released when the request finishes, fails, times out,
//! or is dropped.

use std::{error, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use tracing::trace;

/// A single request to a metadata service.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Create a request with no headers.
    pub fn new(method: Method, uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            timeout,
        }
    }

    /// Replace the headers of this request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// A complete response from a metadata service.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The body as UTF-8, or `None` if it isn't valid UTF-8.
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Boxed error type used as the source of a [`TransportError`].
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// We could not get any response at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("timed out requesting {uri}")]
    TimedOut { uri: String },
    /// We could not connect to the server.
    #[error("could not connect to {uri}")]
    Connect {
        uri: String,
        #[source]
        source: BoxError,
    },
    /// Any other transport failure.
    #[error("error requesting {uri}")]
    Other {
        uri: String,
        #[source]
        source: BoxError,
    },
}

/// Something which can send a single HTTP request.
///
/// We use the `async_trait` macro so that this can be used as a
/// `dyn HttpRequester`.
#[async_trait]
pub trait HttpRequester: Send + Sync {
    /// Send `request` and wait for the full response, enforcing
    /// `request.timeout`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// The default [`HttpRequester`], based on `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestRequester;

impl ReqwestRequester {
    /// Build a client which will only ever be used for one request.
    fn one_shot_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(0)
            // Proxies can't reach link-local addresses.
            .no_proxy()
            .build()
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!("{} {}", request.method, request.uri);
        let uri = request.uri.clone();
        let classify = |err: reqwest::Error| classify_error(&uri, err);

        // `client` is dropped when this function returns by any path, which
        // closes the connection.
        let client = Self::one_shot_client(request.timeout).map_err(classify)?;
        let response = client
            .request(request.method, request.uri.as_str())
            .headers(request.headers)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        let headers = response.headers().to_owned();
        let body = response.bytes().await.map_err(classify)?;
        trace!("{} {} bytes from {}", status, body.len(), uri);
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Convert a `reqwest` error into a [`TransportError`].
fn classify_error(uri: &str, err: reqwest::Error) -> TransportError {
    let uri = uri.to_owned();
    if err.is_timeout() {
        TransportError::TimedOut { uri }
    } else if err.is_connect() {
        TransportError::Connect {
            uri,
            source: Box::new(err),
        }
    } else {
        TransportError::Other {
            uri,
            source: Box::new(err),
        }
    }
}

//! An in-memory [`HttpRequester`] for tests.

use std::{
    collections::{HashMap, VecDeque},
    future,
    sync::Mutex,
};

use async_trait::async_trait;
use http::Method;

use crate::requester::{HttpRequest, HttpRequester, HttpResponse, TransportError};

/// What to do when we see a request.
enum Scripted {
    Respond(HttpResponse),
    Fail(TransportError),
    /// Never respond.
    Hang,
}

/// Returns canned responses and records every request it sees.
///
/// Each scripted outcome is used once. Requests with nothing scripted fail
/// with [`TransportError::Connect`].
#[derive(Default)]
pub(crate) struct ScriptedRequester {
    script: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedRequester {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(self, method: Method, uri: &str, scripted: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry((method, uri.to_owned()))
            .or_default()
            .push_back(scripted);
        self
    }

    pub(crate) fn respond(self, method: Method, uri: &str, response: HttpResponse) -> Self {
        self.push(method, uri, Scripted::Respond(response))
    }

    pub(crate) fn fail(self, method: Method, uri: &str, err: TransportError) -> Self {
        self.push(method, uri, Scripted::Fail(err))
    }

    pub(crate) fn hang(self, method: Method, uri: &str) -> Self {
        self.push(method, uri, Scripted::Hang)
    }

    /// All the requests we've seen so far, in order.
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpRequester for ScriptedRequester {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method.clone(), request.uri.clone());
        self.requests.lock().unwrap().push(request);
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => future::pending().await,
            None => Err(TransportError::Connect {
                uri: key.1,
                source: "nothing scripted for this request".into(),
            }),
        }
    }
}

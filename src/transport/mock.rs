//! Scripted in-memory transport for tests
//!
//! Routes are keyed by method and full URL. Unrouted calls behave like a
//! service that is not listening. Every call is recorded so tests can
//! assert on what was sent and in which order.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::common::{Error, Result};

use super::{Method, Request, Response, Transport};

/// Canned reaction to a request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with a status and a JSON body
    Json { status: u16, body: Value },
    /// Respond with a status and a raw text body
    Text { status: u16, body: String },
    /// Fail as if nothing was listening
    Unreachable,
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        MockReply::Json { status: 200, body }
    }

    pub fn status(status: u16, body: &str) -> Self {
        MockReply::Text {
            status,
            body: body.to_string(),
        }
    }
}

type Handler = Arc<dyn Fn(&Request) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct Route {
    handler: Handler,
    delay: Option<Duration>,
}

/// Transport answering from a table of scripted routes
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `method url` with the same reply
    pub fn on(&self, method: Method, url: &str, reply: MockReply) -> &Self {
        self.on_fn(method, url, move |_| reply.clone())
    }

    /// Answer calls to `method url` by invoking `handler`
    pub fn on_fn<F>(&self, method: Method, url: &str, handler: F) -> &Self
    where
        F: Fn(&Request) -> MockReply + Send + Sync + 'static,
    {
        self.insert(method, url, Arc::new(handler), None)
    }

    /// Like [`on`](Self::on), but the reply is only sent after `delay`
    pub fn on_delayed(&self, method: Method, url: &str, delay: Duration, reply: MockReply) -> &Self {
        self.insert(method, url, Arc::new(move |_| reply.clone()), Some(delay))
    }

    fn insert(&self, method: Method, url: &str, handler: Handler, delay: Option<Duration>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), Route { handler, delay });
        self
    }

    /// All requests received so far, in arrival order
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    /// `METHOD url` strings for every request received, in arrival order
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        self.calls.lock().unwrap().push(request.clone());

        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, request.url.clone()))
            .cloned();

        let Some(route) = route else {
            return Err(Error::unreachable(&request.url, "connection refused"));
        };

        if let Some(delay) = route.delay {
            if delay > request.timeout {
                tokio::time::sleep(request.timeout).await;
                return Err(Error::timeout(&request.url, request.timeout.as_secs()));
            }
            tokio::time::sleep(delay).await;
        }

        match (route.handler)(&request) {
            MockReply::Json { status, body } => Ok(Response {
                status,
                body: body.to_string(),
            }),
            MockReply::Text { status, body } => Ok(Response { status, body }),
            MockReply::Unreachable => Err(Error::unreachable(&request.url, "connection refused")),
        }
    }
}

//! Transport boundary between the orchestrator and the services under test
//!
//! The orchestrator only sees the [`Transport`] trait: a method, a URL, an
//! optional JSON body and a deadline go in, a status code and raw body come
//! out. Connection failures and timeouts are returned as errors, never
//! panics.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::common::Result;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

/// HTTP methods used by probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A single outgoing call
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

impl Request {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            timeout,
        }
    }
}

/// Status and raw body of a completed call
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    /// Whether the service answered with exactly 200 OK
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Performs network calls on behalf of probes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one call, honoring `request.timeout`
    async fn call(&self, request: Request) -> Result<Response>;
}

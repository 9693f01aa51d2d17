//! reqwest-backed transport

use async_trait::async_trait;

use crate::common::{Error, Result};

use super::{Method, Request, Response, Transport};

/// Transport performing real HTTP calls
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("probe-runner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        let Request {
            method,
            url,
            body,
            timeout,
        } = request;

        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .timeout(timeout);

        if let Some(body) = &body {
            builder = builder.json(body);
        }

        tracing::trace!(%method, %url, "sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, &url, timeout.as_secs()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify(e, &url, timeout.as_secs()))?;

        tracing::trace!(%method, %url, status, "received response");

        Ok(Response { status, body })
    }
}

fn classify(e: reqwest::Error, url: &str, timeout_secs: u64) -> Error {
    if e.is_timeout() {
        Error::timeout(url, timeout_secs)
    } else if e.is_connect() {
        Error::unreachable(url, e)
    } else {
        Error::Http(e.to_string())
    }
}

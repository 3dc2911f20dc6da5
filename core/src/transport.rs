//! HTTP transport seam and its `reqwest` implementation.
//!
//! # Design
//! The executor only needs one capability from the network: send an
//! `HttpRequest` and hand back a `RawResponse` as soon as the status line and
//! headers are in, leaving the body on the wire. Timeouts, TLS and connection
//! reuse belong to the transport; the pipeline never retries.

use std::future::Future;

use futures_util::TryStreamExt;
use http::header::{HeaderMap, HeaderName};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http::{BodyStream, HttpRequest, RawResponse};

/// Errors produced by a `Transport` or while streaming a body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("body stream failed: {0}")]
    Body(String),

    #[error("the operation was cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Sends requests and returns replies with the body still unread.
pub trait Transport: Send + Sync {
    type Response: RawResponse + 'static;

    /// Dispatch `request`. Resolves once response headers are available.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<Self::Response, TransportError>> + Send;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client honoring the timeout and user agent in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    type Response = ReqwestReply;

    async fn send(&self, request: HttpRequest) -> Result<ReqwestReply, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        Ok(ReqwestReply::new(response))
    }
}

/// Whether `name` describes the body rather than the response.
fn is_content_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "allow"
            | "content-disposition"
            | "content-encoding"
            | "content-language"
            | "content-length"
            | "content-location"
            | "content-md5"
            | "content-range"
            | "content-type"
            | "expires"
            | "last-modified"
    )
}

/// Partition `headers` into response-level and content-level sets.
pub fn split_content_headers(headers: &HeaderMap) -> (HeaderMap, HeaderMap) {
    let mut primary = HeaderMap::new();
    let mut content = HeaderMap::new();
    for (name, value) in headers {
        let target = if is_content_header(name) {
            &mut content
        } else {
            &mut primary
        };
        target.append(name.clone(), value.clone());
    }
    (primary, content)
}

/// A `reqwest::Response` whose body has not been read.
#[derive(Debug)]
pub struct ReqwestReply {
    status: u16,
    headers: HeaderMap,
    content_headers: HeaderMap,
    response: Option<reqwest::Response>,
}

impl ReqwestReply {
    pub fn new(response: reqwest::Response) -> Self {
        let (headers, content_headers) = split_content_headers(response.headers());
        Self {
            status: response.status().as_u16(),
            headers,
            content_headers,
            response: Some(response),
        }
    }
}

impl RawResponse for ReqwestReply {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn content_headers(&self) -> Option<&HeaderMap> {
        Some(&self.content_headers)
    }

    fn take_body(&mut self) -> Option<BodyStream> {
        let response = self.response.take()?;
        Some(Box::pin(response.bytes_stream().map_err(TransportError::from)))
    }
}

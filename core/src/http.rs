//! HTTP message types shared by the executor, envelope and transports.
//!
//! # Design
//! The outgoing side is plain data: `HttpRequest` owns its URL, headers and
//! JSON body as `String`s so any transport can execute it. The incoming side
//! is a trait, `RawResponse`, because the reply is a live transport handle:
//! status and headers are available as soon as they were read, while the body
//! stays on the wire until someone takes it. Dropping the handle releases the
//! underlying connection.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use http::HeaderMap;

use crate::transport::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// An outgoing HTTP request described as plain data.
///
/// Built by `Executor` from an `ApiRequest`; `url` is already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// A request carrying `body` as JSON, or no body at all.
    pub fn json(method: HttpMethod, url: String, body: Option<String>) -> Self {
        let headers = match body {
            Some(_) => vec![("content-type".to_string(), "application/json".to_string())],
            None => Vec::new(),
        };
        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

/// Lazily consumed response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A transport reply whose headers have been read and whose body has not.
///
/// Implementations own the transport resource; dropping the value releases it.
pub trait RawResponse: Send {
    fn status(&self) -> u16;

    /// Response-level headers.
    fn headers(&self) -> &HeaderMap;

    /// Content-level headers (`Content-Type`, `Content-Length`, ...), when the
    /// transport keeps them apart from the response-level set.
    fn content_headers(&self) -> Option<&HeaderMap>;

    /// Hand out the body stream. Returns `None` once taken, or when the reply
    /// has no body at all.
    fn take_body(&mut self) -> Option<BodyStream>;
}

/// Merge response-level and content-level headers.
///
/// A name present in `content` replaces every value of that name in
/// `primary`; all other primary entries are kept in order.
pub fn merge_headers(primary: &HeaderMap, content: Option<&HeaderMap>) -> HeaderMap {
    let mut merged = primary.clone();
    let Some(content) = content else {
        return merged;
    };
    for name in content.keys() {
        merged.remove(name);
        for value in content.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    merged
}

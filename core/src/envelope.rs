//! Response envelope: status classification and typed decoding of a reply.
//!
//! # Design
//! An envelope exclusively owns one `RawResponse`. Status is copied out at
//! construction so it survives `release`. Merged headers are computed on the
//! first `headers()` call and cached; the envelope is never shared between
//! calls, so a plain `Option` is enough. The body is single-shot: the first
//! read takes the stream, any later read fails with `BodyConsumed`.

use std::any::type_name;
use std::fmt;
use std::future::Future;

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::error::ApiError;
use crate::http::{merge_headers, RawResponse};
use crate::naming::NamingConvention;
use crate::wire;

/// Statuses whose body is decoded as the expected value.
pub const SUCCESS_STATUSES: [u16; 4] = [200, 201, 204, 304];

pub fn is_success_status(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Turns a raw reply into a typed result.
///
/// `Executor` resolves the decoder type through this trait, either from a
/// type parameter (`D::from_raw`) or from a factory supplied at setup.
pub trait ResponseDecoder<R: RawResponse>: Send + Sized {
    fn from_raw(raw: R, naming: NamingConvention) -> Self;

    fn status_code(&self) -> u16;

    fn decode_or_fail<T>(&mut self) -> impl Future<Output = Result<T, ApiError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Release the transport handle. Idempotent.
    fn release(&mut self);
}

/// Default `ResponseDecoder` over any `RawResponse`.
pub struct ResponseEnvelope<R> {
    raw: Option<R>,
    status: u16,
    naming: NamingConvention,
    headers: Option<HeaderMap>,
    body_taken: bool,
}

impl<R> ResponseEnvelope<R> {
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    pub fn is_released(&self) -> bool {
        self.raw.is_none()
    }

    /// Drop the transport handle. Later body reads fail with `BodyConsumed`;
    /// the status code stays available.
    pub fn release(&mut self) {
        self.body_taken = true;
        if let Some(raw) = self.raw.take() {
            drop(raw);
            trace!(status = self.status, "released response");
        }
    }
}

impl<R: RawResponse> ResponseEnvelope<R> {
    pub fn new(raw: R, naming: NamingConvention) -> Self {
        Self {
            status: raw.status(),
            raw: Some(raw),
            naming,
            headers: None,
            body_taken: false,
        }
    }

    /// Response-level headers merged with content-level headers, the latter
    /// winning on a name collision. Computed once, then served from cache.
    ///
    /// Empty when the envelope was released before the first call.
    pub fn headers(&mut self) -> &HeaderMap {
        let raw = &self.raw;
        self.headers.get_or_insert_with(|| match raw {
            Some(raw) => merge_headers(raw.headers(), raw.content_headers()),
            None => HeaderMap::new(),
        })
    }

    async fn read_body(&mut self) -> Result<Option<Bytes>, ApiError> {
        if self.body_taken {
            return Err(ApiError::BodyConsumed);
        }
        self.body_taken = true;
        let Some(raw) = self.raw.as_mut() else {
            return Err(ApiError::BodyConsumed);
        };
        let Some(mut stream) = raw.take_body() else {
            return Ok(None);
        };
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(Some(buf.freeze()))
    }

    /// The raw body as text, `None` when the reply has no body. Single-shot.
    pub async fn body_text(&mut self) -> Result<Option<String>, ApiError> {
        let body = self.read_body().await?;
        Ok(body.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Decode the body as `T` using the configured naming convention.
    ///
    /// The body may hold several top-level JSON documents; the last one is
    /// kept. `None` when there is no body or it holds no value.
    pub async fn decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ApiError> {
        let Some(bytes) = self.read_body().await? else {
            return Ok(None);
        };
        wire::decode_documents(&bytes, self.naming).map_err(|source| ApiError::Decode {
            type_name: type_name::<T>(),
            source,
        })
    }

    /// Decode on 200/201/204/304, otherwise fail with the raw body attached.
    pub async fn decode_or_fail<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        if self.is_success() {
            return self.decode().await?.ok_or(ApiError::UnexpectedEmptyResponse);
        }
        let body = match self.body_text().await {
            Ok(text) => text.unwrap_or_default(),
            Err(err) => {
                warn!(status = self.status, error = %err, "could not read error response body");
                String::new()
            }
        };
        warn!(status = self.status, "unexpected response status");
        Err(ApiError::UnexpectedStatus {
            status: self.status,
            body,
        })
    }
}

impl<R: RawResponse> ResponseDecoder<R> for ResponseEnvelope<R> {
    fn from_raw(raw: R, naming: NamingConvention) -> Self {
        Self::new(raw, naming)
    }

    fn status_code(&self) -> u16 {
        self.status
    }

    async fn decode_or_fail<T>(&mut self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        ResponseEnvelope::decode_or_fail(self).await
    }

    fn release(&mut self) {
        ResponseEnvelope::release(self)
    }
}

impl<R> fmt::Debug for ResponseEnvelope<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseEnvelope")
            .field("status", &self.status)
            .field("naming", &self.naming)
            .field("released", &self.raw.is_none())
            .field("body_taken", &self.body_taken)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures_util::stream;
    use http::HeaderValue;
    use serde::Deserialize;

    use super::*;
    use crate::http::BodyStream;
    use crate::transport::TransportError;

    struct FakeReply {
        status: u16,
        headers: HeaderMap,
        content_headers: Option<HeaderMap>,
        body: Option<Vec<Result<&'static str, &'static str>>>,
        header_reads: Arc<AtomicUsize>,
        drops: Arc<AtomicUsize>,
    }

    impl FakeReply {
        fn new(status: u16, body: Option<&'static str>) -> Self {
            Self {
                status,
                headers: HeaderMap::new(),
                content_headers: None,
                body: body.map(|b| vec![Ok(b)]),
                header_reads: Arc::default(),
                drops: Arc::default(),
            }
        }
    }

    impl RawResponse for FakeReply {
        fn status(&self) -> u16 {
            self.status
        }

        fn headers(&self) -> &HeaderMap {
            self.header_reads.fetch_add(1, Ordering::SeqCst);
            &self.headers
        }

        fn content_headers(&self) -> Option<&HeaderMap> {
            self.content_headers.as_ref()
        }

        fn take_body(&mut self) -> Option<BodyStream> {
            let chunks = self.body.take()?;
            Some(Box::pin(stream::iter(chunks.into_iter().map(|chunk| {
                chunk
                    .map(|s| Bytes::from_static(s.as_bytes()))
                    .map_err(|e| TransportError::Body(e.to_string()))
            }))))
        }
    }

    impl Drop for FakeReply {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        #[serde(rename = "Id")]
        id: u64,
    }

    fn envelope(reply: FakeReply) -> ResponseEnvelope<FakeReply> {
        ResponseEnvelope::new(reply, NamingConvention::SnakeCase)
    }

    #[tokio::test]
    async fn decodes_success_body() {
        let mut env = envelope(FakeReply::new(200, Some(r#"{"id": 7}"#)));
        let user: User = env.decode_or_fail().await.unwrap();
        assert_eq!(user, User { id: 7 });
    }

    #[tokio::test]
    async fn every_success_status_decodes() {
        for status in SUCCESS_STATUSES {
            let mut env = envelope(FakeReply::new(status, Some("[1,2]")));
            let list: Vec<u32> = env.decode_or_fail().await.unwrap();
            assert_eq!(list, vec![1, 2], "status {status}");
        }
    }

    #[tokio::test]
    async fn empty_success_body_is_an_error() {
        let mut env = envelope(FakeReply::new(204, Some("")));
        let err = env.decode_or_fail::<User>().await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedEmptyResponse));

        let mut env = envelope(FakeReply::new(200, None));
        let err = env.decode_or_fail::<User>().await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedEmptyResponse));
    }

    #[tokio::test]
    async fn non_success_status_carries_raw_body() {
        let mut env = envelope(FakeReply::new(500, Some("internal error")));
        let err = env.decode_or_fail::<User>().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::UnexpectedStatus { status: 500, ref body } if body == "internal error"
        ));
    }

    #[tokio::test]
    async fn non_success_without_body_has_empty_text() {
        let mut env = envelope(FakeReply::new(202, None));
        let err = env.decode_or_fail::<User>().await.unwrap_err();
        assert_eq!(err.status(), Some(202));
        assert_eq!(err.body(), Some(""));
    }

    #[tokio::test]
    async fn decode_error_names_target_type() {
        let mut env = envelope(FakeReply::new(200, Some("{not json")));
        let err = env.decode::<User>().await.unwrap_err();
        match err {
            ApiError::Decode { type_name, .. } => assert!(type_name.ends_with("User")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_stream_error_becomes_transport_error() {
        let mut reply = FakeReply::new(200, None);
        reply.body = Some(vec![Ok("{\"id\""), Err("connection reset")]);
        let mut env = envelope(reply);
        let err = env.decode::<User>().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn chunked_body_is_reassembled() {
        let mut reply = FakeReply::new(200, None);
        reply.body = Some(vec![Ok("{\"i"), Ok("d\": "), Ok("9}")]);
        let mut env = envelope(reply);
        assert_eq!(env.decode::<User>().await.unwrap(), Some(User { id: 9 }));
    }

    #[tokio::test]
    async fn body_is_single_shot() {
        let mut env = envelope(FakeReply::new(200, Some("[]")));
        assert_eq!(env.body_text().await.unwrap().as_deref(), Some("[]"));
        assert!(matches!(env.body_text().await, Err(ApiError::BodyConsumed)));
        assert!(matches!(env.decode::<Vec<u8>>().await, Err(ApiError::BodyConsumed)));
    }

    #[tokio::test]
    async fn body_text_of_missing_body_is_none() {
        let mut env = envelope(FakeReply::new(304, None));
        assert_eq!(env.body_text().await.unwrap(), None);
    }

    #[test]
    fn headers_are_merged_once_and_cached() {
        let mut reply = FakeReply::new(200, None);
        reply.headers.insert("content-type", HeaderValue::from_static("text/plain"));
        reply.headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let mut content = HeaderMap::new();
        content.insert("content-type", HeaderValue::from_static("application/json"));
        reply.content_headers = Some(content);
        let reads = reply.header_reads.clone();

        let mut env = envelope(reply);
        let first = env.headers().clone();
        let second = env.headers().clone();
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(first.get("Content-Type").unwrap(), "application/json");
        assert_eq!(first.get("X-Request-Id").unwrap(), "abc");
    }

    #[tokio::test]
    async fn release_is_idempotent_and_keeps_status() {
        let reply = FakeReply::new(201, Some("{}"));
        let drops = reply.drops.clone();

        let mut env = envelope(reply);
        env.release();
        env.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(env.is_released());
        assert_eq!(env.status_code(), 201);
        assert!(env.headers().is_empty());
        assert!(matches!(env.body_text().await, Err(ApiError::BodyConsumed)));

        drop(env);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_envelope_releases_reply() {
        let reply = FakeReply::new(200, None);
        let drops = reply.drops.clone();
        drop(envelope(reply));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}

//! The executor: one typed request/response cycle per call.
//!
//! # Design
//! `Executor` holds only immutable setup (transport, base URL, naming
//! convention, decoder factory), so concurrent calls share nothing mutable.
//! Each call builds its own `HttpRequest`, owns the reply through a decoder,
//! and releases it on every exit path: explicitly after decoding, or by drop
//! when the call is cancelled mid-flight.

use std::fmt;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::{ResponseDecoder, ResponseEnvelope};
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::naming::NamingConvention;
use crate::request::ApiRequest;
use crate::transport::{ReqwestReply, ReqwestTransport, Transport, TransportError};
use crate::wire;

/// Builds a decoder around a raw reply.
pub type DecoderFactory<R, D> = fn(R, NamingConvention) -> D;

/// Executes `ApiRequest`s over a `Transport` and decodes typed results.
pub struct Executor<Tr: Transport, D> {
    transport: Tr,
    base_url: String,
    naming: NamingConvention,
    make_decoder: DecoderFactory<Tr::Response, D>,
}

impl<Tr: Transport> Executor<Tr, ResponseEnvelope<Tr::Response>> {
    /// Executor decoding through the default `ResponseEnvelope`.
    pub fn new(transport: Tr, config: &ClientConfig) -> Self {
        Self::with_decoder(transport, config, ResponseEnvelope::new)
    }
}

impl Executor<ReqwestTransport, ResponseEnvelope<ReqwestReply>> {
    /// Executor over a `reqwest` client built from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(transport, config))
    }
}

impl<Tr: Transport, D> Executor<Tr, D> {
    /// Executor whose decoder type is produced by `make_decoder`.
    pub fn with_decoder(transport: Tr, config: &ClientConfig, make_decoder: DecoderFactory<Tr::Response, D>) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            naming: config.naming,
            make_decoder,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    pub fn transport(&self) -> &Tr {
        &self.transport
    }

    /// Absolute target for `path`: the base URL and the path joined as-is.
    ///
    /// No normalization happens. A doubled or missing `/` at the join point
    /// is logged and kept; getting the base URL right is the caller's job.
    /// A path starting with `?` or `#` adds a query or fragment to the base
    /// URL itself and needs no separator.
    pub fn target_url(&self, path: &str) -> Result<String, ApiError> {
        if path.is_empty() {
            return Err(ApiError::InvalidArgument("request path must not be empty".to_string()));
        }
        let base_slash = self.base_url.ends_with('/');
        let path_slash = path.starts_with('/');
        if base_slash && path_slash {
            warn!(base_url = %self.base_url, path, "target URL contains a double slash");
        } else if !base_slash && !path_slash && !path.starts_with(['?', '#']) && !self.base_url.is_empty() {
            warn!(base_url = %self.base_url, path, "target URL is missing a path separator");
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    /// The outgoing message for `request`, body encoded per the naming convention.
    pub fn build_request<Req: ApiRequest + ?Sized>(&self, request: &Req) -> Result<HttpRequest, ApiError> {
        let url = self.target_url(&request.path())?;
        let body = wire::encode_body(request, self.naming).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest::json(request.method(), url, body))
    }

    /// Send `request` and decode the reply with the configured decoder.
    pub async fn execute<Req, T>(&self, request: &Req, cancel: Option<&CancellationToken>) -> Result<T, ApiError>
    where
        Req: ApiRequest + ?Sized,
        T: DeserializeOwned + Send,
        D: ResponseDecoder<Tr::Response>,
    {
        self.run(request, self.make_decoder, cancel).await
    }

    /// Same contract as `execute`, decoding through `D2` for this call only.
    pub async fn execute_as<Req, T, D2>(&self, request: &Req, cancel: Option<&CancellationToken>) -> Result<T, ApiError>
    where
        Req: ApiRequest + ?Sized,
        T: DeserializeOwned + Send,
        D2: ResponseDecoder<Tr::Response>,
    {
        self.run(request, D2::from_raw, cancel).await
    }

    /// Same contract as `execute`, decoding through a decoder built by `make_decoder`.
    pub async fn execute_with<Req, T, D2>(
        &self,
        request: &Req,
        make_decoder: DecoderFactory<Tr::Response, D2>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError>
    where
        Req: ApiRequest + ?Sized,
        T: DeserializeOwned + Send,
        D2: ResponseDecoder<Tr::Response>,
    {
        self.run(request, make_decoder, cancel).await
    }

    async fn run<Req, T, D2>(
        &self,
        request: &Req,
        make_decoder: DecoderFactory<Tr::Response, D2>,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ApiError>
    where
        Req: ApiRequest + ?Sized,
        T: DeserializeOwned + Send,
        D2: ResponseDecoder<Tr::Response>,
    {
        let outgoing = self.build_request(request)?;
        debug!(method = %outgoing.method, url = %outgoing.url, "dispatching request");

        let exchange = self.exchange(outgoing, make_decoder);
        match cancel {
            None => exchange.await,
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("request cancelled");
                    Err(ApiError::from(TransportError::Cancelled))
                }
                result = exchange => result,
            },
        }
    }

    async fn exchange<T, D2>(&self, outgoing: HttpRequest, make_decoder: DecoderFactory<Tr::Response, D2>) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
        D2: ResponseDecoder<Tr::Response>,
    {
        let raw = self.transport.send(outgoing).await?;
        let mut decoder = make_decoder(raw, self.naming);
        debug!(status = decoder.status_code(), "received response");
        let result = decoder.decode_or_fail::<T>().await;
        decoder.release();
        result
    }
}

impl<Tr: Transport, D> fmt::Debug for Executor<Tr, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.base_url)
            .field("naming", &self.naming)
            .finish_non_exhaustive()
    }
}

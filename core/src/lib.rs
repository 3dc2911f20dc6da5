//! Typed HTTP request/response pipeline.
//!
//! # Overview
//! An `ApiRequest` describes its own path and verb; its serializable fields
//! become a JSON body. `Executor::execute` sends it over a `Transport`, wraps
//! the reply in a `ResponseEnvelope`, and returns either the decoded value or
//! one classified `ApiError`.
//!
//! # Design
//! - Field names on the wire follow a runtime `NamingConvention`
//!   (snake_case by default), applied the same way in both directions.
//! - Status 200/201/204/304 means "decode the body"; anything else fails with
//!   the raw body attached. A success status with no value is an error.
//! - Response bodies are streamed lazily and may hold several concatenated
//!   JSON documents; the last one wins.
//! - No retries, pooling or auth: one call, one outcome.

pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod naming;
pub mod request;
pub mod transport;
pub mod wire;

pub use config::ClientConfig;
pub use envelope::{is_success_status, ResponseDecoder, ResponseEnvelope, SUCCESS_STATUSES};
pub use error::{ApiError, ConfigError};
pub use executor::{DecoderFactory, Executor};
pub use crate::http::{BodyStream, HttpMethod, HttpRequest, RawResponse};
pub use naming::NamingConvention;
pub use request::ApiRequest;
pub use transport::{ReqwestReply, ReqwestTransport, Transport, TransportError};

pub use tokio_util::sync::CancellationToken;

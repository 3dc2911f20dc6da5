//! Error types for the request pipeline.
//!
//! # Design
//! Every failure that crosses the public boundary is one `ApiError` variant.
//! Transport and decoder errors are caught inside the pipeline and re-wrapped,
//! so callers never see a raw `reqwest` or parser error type in the variant
//! they match on. Non-success statuses land in `UnexpectedStatus` with the raw
//! status code and body for debugging.

use std::error::Error as StdError;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by `Executor` and `ResponseEnvelope`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request descriptor is unusable (for example an empty path).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport failed or the call was cancelled. The message carries
    /// the cause and, when present, its inner cause.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The body was present but could not be decoded as `type_name`.
    #[error("could not deserialize the response body stream as {type_name}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with a success status but no decodable value.
    #[error("response was empty, which was not expected")]
    UnexpectedEmptyResponse,

    /// The server answered with a status outside the success set.
    #[error("the response was not expected ({status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The body stream was already read or the response was released.
    #[error("response body already consumed or released")]
    BodyConsumed,
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body carried by the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Transport(describe(&err))
    }
}

/// Flatten an error and its immediate source into one diagnostic line.
pub(crate) fn describe(err: &(dyn StdError + 'static)) -> String {
    match err.source() {
        Some(inner) => format!("{err} ({inner})"),
        None => err.to_string(),
    }
}

/// Errors raised while loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("unknown naming convention {0:?}")]
    UnknownNaming(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

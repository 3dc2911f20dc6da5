//! The request descriptor contract.

use std::borrow::Cow;

use serde::Serialize;

use crate::http::HttpMethod;

/// A typed request payload that knows where and how it is sent.
///
/// `path` and `method` are metadata supplied by the type itself and are never
/// part of the serialized body; only the `Serialize` fields go on the wire.
/// Both must be pure: same value, same answer, no side effects.
///
/// ```
/// use std::borrow::Cow;
/// use serde::Serialize;
/// use typed_http::{ApiRequest, HttpMethod};
///
/// #[derive(Serialize)]
/// struct GetUser {
///     #[serde(skip)]
///     id: u64,
/// }
///
/// impl ApiRequest for GetUser {
///     fn path(&self) -> Cow<'_, str> {
///         Cow::Owned(format!("/users/{}", self.id))
///     }
///
///     fn method(&self) -> HttpMethod {
///         HttpMethod::Get
///     }
/// }
///
/// assert_eq!(GetUser { id: 1 }.path(), "/users/1");
/// ```
pub trait ApiRequest: Serialize {
    /// Resource path relative to the executor's base URL, e.g. `/users/1`.
    fn path(&self) -> Cow<'_, str>;

    fn method(&self) -> HttpMethod;
}

impl<R: ApiRequest + ?Sized> ApiRequest for &R {
    fn path(&self) -> Cow<'_, str> {
        (**self).path()
    }

    fn method(&self) -> HttpMethod {
        (**self).method()
    }
}

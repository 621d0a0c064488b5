//! Incoming HTTP request type.
//!
//! A request is split in two. The [`RequestHead`] (method, path, headers,
//! matched path parameters) sits behind an `Arc` so the router can publish it
//! to filters through [`current_request`](crate::context::current_request)
//! without copying headers. The body and the extensions stay with the
//! [`Request`] the view receives.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};

/// Everything about a request except its body.
#[derive(Clone, Debug)]
pub struct RequestHead {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
}

impl RequestHead {
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Case-insensitive header lookup. Values that are not visible ASCII read
    /// as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// An incoming HTTP request with its body already collected.
#[derive(Debug)]
pub struct Request {
    head: Arc<RequestHead>,
    body: Bytes,
    extensions: Extensions,
}

impl Request {
    /// A request with no headers and an empty body. The server builds these
    /// from the wire; tests build them by hand and pass them to
    /// [`Router::dispatch`](crate::Router::dispatch).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self::from_head(RequestHead {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
        })
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let http::request::Parts { method, uri, headers, extensions, .. } = parts;
        let mut req = Self::from_head(RequestHead {
            method,
            path: uri.path().to_owned(),
            headers,
            params: HashMap::new(),
        });
        req.body = body;
        req.extensions = extensions;
        req
    }

    fn from_head(head: RequestHead) -> Self {
        Self { head: Arc::new(head), body: Bytes::new(), extensions: Extensions::new() }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.head).headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches a typed value before dispatch. Filters see it through
    /// [`context::extension`](crate::context::extension).
    pub fn with_extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        Arc::make_mut(&mut self.head).params = params;
        self
    }

    pub(crate) fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub(crate) fn take_extensions(&mut self) -> Extensions {
        std::mem::take(&mut self.extensions)
    }

    pub(crate) fn share_head(&self) -> Arc<RequestHead> {
        Arc::clone(&self.head)
    }

    pub fn head(&self) -> &RequestHead { &self.head }
    pub fn method(&self) -> &Method { self.head.method() }
    pub fn path(&self) -> &str { self.head.path() }
    pub fn headers(&self) -> &HeaderMap { self.head.headers() }
    pub fn body(&self) -> &[u8] { &self.body }

    /// See [`RequestHead::header`].
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// See [`RequestHead::param`].
    pub fn param(&self, key: &str) -> Option<&str> {
        self.head.param(key)
    }

    /// A value a filter stored for this request with
    /// [`context::insert_extension`](crate::context::insert_extension), or one
    /// attached with [`Request::with_extension`].
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions { &self.extensions }
}

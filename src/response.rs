//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is a plain value: filters read it in their post-phase and
//! return a new one to replace it.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

const TEXT: &str = "text/plain; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use strainer::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::html("<h1>hello</h1>").with_status(StatusCode::CREATED);
/// Response::status(StatusCode::UNAUTHORIZED);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
}

impl Response {
    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_type(TEXT, body.into().into())
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_type(HTML, body.into().into())
    }

    /// `200 OK`, `application/json`. Pass the bytes from your serialiser.
    pub fn json(body: Vec<u8>) -> Self {
        Self::with_type(JSON, body.into())
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, content_type: None, body: Bytes::new() }
    }

    pub fn with_status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn content_type(&self) -> Option<&str> { self.content_type }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The body as UTF-8, if it is.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    fn with_type(content_type: &'static str, body: Bytes) -> Self {
        Self { status: StatusCode::OK, content_type: Some(content_type), body }
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        res
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_inner_carries_status_type_and_body() {
        let res = Response::html("<h1>hi</h1>").with_status(StatusCode::CREATED).into_inner();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], HTML);
    }

    #[test]
    fn bare_status_has_no_content_type() {
        let res = Response::status(StatusCode::IM_A_TEAPOT);
        assert_eq!(res.content_type(), None);
        assert!(res.body().is_empty());
        assert!(res.into_inner().headers().get(CONTENT_TYPE).is_none());
    }
}

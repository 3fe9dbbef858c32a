use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use serde::Serialize;

// -- Shared helpers --

fn insert_header(headers: &mut HeaderMap, key: &str, value: &str) {
    if let (Result::Ok(name), Result::Ok(val)) = (
        HeaderName::from_bytes(key.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, val);
    }
}

/// A fully buffered response produced by a handler
///
/// Plain data: the application turns it into an HTTP response only at the
/// transport boundary, so tests can inspect status, headers and body
/// directly.
///
/// ```
/// use jsweb::Response;
///
/// let response = Response::html("<h1>Hi</h1>").with_header("X-Frame-Options", "DENY");
/// assert_eq!(response.status().as_u16(), 200);
/// assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
/// assert_eq!(response.text_body(), "<h1>Hi</h1>");
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// `text/plain` body
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    /// `text/html` body
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok()
            .with_header(header::CONTENT_TYPE.as_str(), "text/html; charset=utf-8")
            .with_body(body.into())
    }

    /// `application/json` body from an already built value
    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok()
            .with_header(header::CONTENT_TYPE.as_str(), "application/json")
            .with_body(value.to_string())
    }

    /// `application/json` body from any serializable value
    pub fn json_from<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::ok()
            .with_header(header::CONTENT_TYPE.as_str(), "application/json")
            .with_body(body))
    }

    /// 303 See Other to `location`
    pub fn redirect(location: impl AsRef<str>) -> Self {
        Self::new(StatusCode::SEE_OTHER).with_header(header::LOCATION.as_str(), location.as_ref())
    }

    /// Set the HTTP status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header; invalid names or values are skipped.
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        insert_header(&mut self.headers, key.as_ref(), value.as_ref());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossy
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_json_response() {
        let response = Response::json(&serde_json::json!({"ok": true}));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.text_body(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_json_from_struct() {
        #[derive(Serialize)]
        struct User {
            id: i64,
        }
        let response = Response::json_from(&User { id: 3 }).unwrap();
        assert_eq!(response.text_body(), r#"{"id":3}"#);
    }

    #[test]
    fn test_redirect() {
        let response = Response::redirect("/login");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), Some("/login"));
    }

    #[test]
    fn test_invalid_header_skipped() {
        let response = Response::ok().with_header("bad header", "x");
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_into_axum_response() {
        let response = Response::text("teapot")
            .with_status(StatusCode::IM_A_TEAPOT)
            .into_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}

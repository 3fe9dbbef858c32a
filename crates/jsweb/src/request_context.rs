// File: src/request_context.rs
// Purpose: Per-request context with route params, query, headers, cookies and body

use anyhow::Context as _;
use axum::body::Bytes;
use axum::http::HeaderMap;
use jsweb_router::path::split_query;
use jsweb_router::{Method, ParamValue, Params};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::Config;

/// Request context handed to every handler
///
/// One per request, owned by that request. The configuration is shared and
/// read-only.
#[derive(Clone)]
pub struct RequestContext {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: Method,

    /// Request path, without query string
    pub path: String,

    /// Typed values extracted from the path
    pub params: Params,

    /// Query parameters from URL (?key=value)
    pub query: QueryParams,

    /// Request headers
    pub headers: HeaderMap,

    /// Parsed cookies
    pub cookies: HashMap<String, String>,

    /// Raw request body
    pub body: Bytes,

    /// Application configuration, passed through unmodified
    pub config: Arc<Config>,

    /// Declared pattern of the matched route
    pub route_pattern: Option<String>,

    /// Name of the matched route, if it has one
    pub route_name: Option<String>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("route", &self.route_pattern)
            .finish()
    }
}

impl RequestContext {
    /// Create a context from the raw request target (path plus optional query)
    pub fn new(
        method: Method,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
        config: Arc<Config>,
    ) -> Self {
        let (path, query) = split_query(target);
        let cookies = Self::parse_cookies(&headers);

        Self {
            method,
            path: path.to_string(),
            params: Params::new(),
            query: query.map(QueryParams::parse).unwrap_or_default(),
            headers,
            cookies,
            body,
            config,
            route_pattern: None,
            route_name: None,
        }
    }

    /// Attach the matched route's parameters
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Attach the matched route's pattern and name
    pub fn with_route(mut self, pattern: impl Into<String>, name: Option<&str>) -> Self {
        self.route_pattern = Some(pattern.into());
        self.route_name = name.map(str::to_string);
        self
    }

    /// Parse cookies from Cookie header
    fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
        let mut cookies = HashMap::new();

        for cookie_header in headers.get_all("cookie") {
            if let Ok(cookie_str) = cookie_header.to_str() {
                for cookie in cookie_str.split(';') {
                    let cookie = cookie.trim();
                    if let Some((key, value)) = cookie.split_once('=') {
                        cookies.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        cookies
    }

    /// Get a path parameter
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Get a cookie value
    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    /// Get a header value
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Check if request accepts JSON
    pub fn accepts_json(&self) -> bool {
        self.get_header("accept")
            .is_some_and(|accept| accept.contains("json"))
    }

    /// Check if the body is declared as JSON
    pub fn is_json(&self) -> bool {
        self.get_header("content-type")
            .is_some_and(|ct| ct.starts_with("application/json"))
    }

    /// Whether the application runs under its test configuration
    pub fn is_testing(&self) -> bool {
        self.config.testing
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        serde_json::from_slice(&self.body).context("request body is not valid JSON")
    }
}

/// Decodes `a=1&b=two+words` pairs; undecodable pairs are dropped
fn parse_urlencoded(input: &str) -> HashMap<String, String> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                urlencoding::decode(&s.replace('+', " "))
                    .ok()
                    .map(|d| d.into_owned())
            };
            Some((decode(key)?, decode(value)?))
        })
        .collect()
}

/// Query parameters from URL
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    /// Create from HashMap
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Parse a raw query string (without the leading `?`)
    pub fn parse(query: &str) -> Self {
        Self::new(parse_urlencoded(query))
    }

    /// Get a query parameter value
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a query parameter as a specific type
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.params.get(key)?.parse().ok()
    }

    /// Check if a parameter exists
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get all parameter names
    pub fn keys(&self) -> Vec<&String> {
        self.params.keys().collect()
    }

    /// Get as HashMap
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;
    use serde_json::Value as JsonValue;

    fn context(target: &str, headers: HeaderMap, body: &'static str) -> RequestContext {
        RequestContext::new(
            Method::Post,
            target,
            headers,
            Bytes::from_static(body.as_bytes()),
            Arc::new(Config::for_testing()),
        )
    }

    #[test]
    fn test_query_split_from_path() {
        let ctx = context("/search?q=rust+lang&page=2", HeaderMap::new(), "");
        assert_eq!(ctx.path, "/search");
        assert_eq!(ctx.query.get("q"), Some(&"rust lang".to_string()));
        assert_eq!(ctx.query.get_as::<u32>("page"), Some(2));
        assert!(!ctx.query.has("missing"));
    }

    #[test]
    fn test_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("session=abc; csrf_token=xyz"));
        let ctx = context("/", headers, "");
        assert_eq!(ctx.get_cookie("session"), Some(&"abc".to_string()));
        assert_eq!(ctx.get_cookie("csrf_token"), Some(&"xyz".to_string()));
    }

    #[test]
    fn test_config_passed_through() {
        let ctx = context("/", HeaderMap::new(), "");
        assert!(ctx.is_testing());
    }

    #[test]
    fn test_json_body() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let ctx = context("/api", headers, r#"{"message": "hello"}"#);

        let value: JsonValue = ctx.json().unwrap();
        assert_eq!(value["message"], "hello");
        assert!(ctx.is_json());
    }

    #[test]
    fn test_invalid_json_body() {
        let ctx = context("/api", HeaderMap::new(), "{nope");
        assert!(ctx.json::<JsonValue>().is_err());
    }
}

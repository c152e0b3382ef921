//! Request parsing.
//!
//! # Responsibilities
//! - Reduce an HTTP request to a `ParsedRequest`
//! - Decode the query string and JSON body
//! - Extract the session carrier from the `Cookie` header
//!
//! # Design Decisions
//! - A malformed or oversized body is carried, not rejected, so an unknown route still 404s
//! - Body size is bounded by the limit layer and again while buffering

use std::collections::HashMap;

use std::error::Error as StdError;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
};
use http_body_util::LengthLimitError;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::dispatch::{ParsedRequest, RequestBody};

/// Header carrying the request ID (set by the request-id layer).
pub const X_REQUEST_ID: &str = "x-request-id";

/// Convert an incoming request into the dispatcher's view of it.
pub async fn parse_request(
    request: Request<Body>,
    cookie_name: &str,
    max_body_size: usize,
    cancel: CancellationToken,
) -> ParsedRequest {
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let body = match axum::body::to_bytes(body, max_body_size).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => RequestBody::Empty,
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => RequestBody::Malformed(e.to_string()),
        },
        Err(e) if is_length_limit(&e) => RequestBody::TooLarge,
        Err(e) => RequestBody::Malformed(e.to_string()),
    };

    ParsedRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parse_query(parts.uri.query()),
        body,
        session_carrier: cookie_value(&parts.headers, cookie_name),
        request_id,
        cancel,
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Decode a query string. Later duplicates overwrite earlier ones.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};
    use serde_json::json;

    #[test]
    fn test_parse_query() {
        let query = parse_query(Some("author=alice&tag=a%20b&empty="));
        assert_eq!(query["author"], "alice");
        assert_eq!(query["tag"], "a b");
        assert_eq!(query["empty"], "");
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; sid=abc"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, "sid").as_deref(), Some("abc"));
        assert_eq!(cookie_value(&headers, "other").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[tokio::test]
    async fn test_parse_request() {
        let request = Request::builder()
            .method(Method::PATCH)
            .uri("/api/posts/abc?x=1")
            .header(X_REQUEST_ID, "req-1")
            .header(header::COOKIE, "sid=s1")
            .body(Body::from(r#"{"content":"x"}"#))
            .unwrap();

        let parsed = parse_request(request, "sid", 1024, CancellationToken::new()).await;
        assert_eq!(parsed.method, Method::PATCH);
        assert_eq!(parsed.path, "/api/posts/abc");
        assert_eq!(parsed.query["x"], "1");
        assert_eq!(parsed.body, RequestBody::Json(json!({ "content": "x" })));
        assert_eq!(parsed.session_carrier.as_deref(), Some("s1"));
        assert_eq!(parsed.request_id, "req-1");
    }

    #[tokio::test]
    async fn test_malformed_and_empty_bodies() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/posts")
            .body(Body::from("{not json"))
            .unwrap();
        let parsed = parse_request(request, "sid", 1024, CancellationToken::new()).await;
        assert!(matches!(parsed.body, RequestBody::Malformed(_)));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/logout")
            .body(Body::empty())
            .unwrap();
        let parsed = parse_request(request, "sid", 1024, CancellationToken::new()).await;
        assert_eq!(parsed.body, RequestBody::Empty);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/posts")
            .body(Body::from(vec![b' '; 64]))
            .unwrap();
        let parsed = parse_request(request, "sid", 16, CancellationToken::new()).await;
        assert_eq!(parsed.body, RequestBody::TooLarge);
    }
}

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::fmt;
use uuid::Uuid;

pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

const MAX_TRACE_ID_LEN: usize = 128;

/// Correlation id for one request, shared by logs, the request span and the
/// `x-trace-id` response header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceId(String);

impl TraceId {
    pub fn generate() -> Self {
        TraceId(Uuid::new_v4().to_string())
    }

    /// Accepts a client-supplied id made of ASCII letters, digits, `-` and `_`.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= MAX_TRACE_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| TraceId(value.to_string()))
    }

    /// The caller's id when usable, a fresh one otherwise.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::parse)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the request's [`TraceId`], records it on the request span, stores
/// it in extensions and returns it on the response. Malformed client ids are
/// replaced rather than echoed.
pub async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = TraceId::from_headers(request.headers());
    tracing::Span::current().record("trace_id", trace_id.as_str());

    if let Some(value) = trace_id.header_value() {
        request.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    request.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(request).await;
    if let Some(value) = trace_id.header_value() {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(trace_id): Extension<TraceId>| async move { trace_id.to_string() }),
            )
            .layer(middleware::from_fn(trace_context_middleware))
    }

    async fn call(trace_header: Option<&str>) -> (String, String) {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = trace_header {
            builder = builder.header(TRACE_ID_HEADER, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()[TRACE_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_client_trace_id_reaches_handler_and_response() {
        let (header, seen_by_handler) = call(Some("drill-2024_05")).await;
        assert_eq!(header, "drill-2024_05");
        assert_eq!(seen_by_handler, "drill-2024_05");
    }

    #[tokio::test]
    async fn test_missing_trace_id_is_generated() {
        let (header, seen_by_handler) = call(None).await;
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(header, seen_by_handler);
    }

    #[tokio::test]
    async fn test_malformed_trace_id_is_replaced() {
        let too_long = "a".repeat(MAX_TRACE_ID_LEN + 1);
        for bad in ["", "has space", "semi;colon", too_long.as_str()] {
            let (header, _) = call(Some(bad)).await;
            assert_ne!(header, bad);
            assert!(Uuid::parse_str(&header).is_ok(), "{bad:?} was not replaced");
        }
    }

    #[test]
    fn test_parse_bounds() {
        assert!(TraceId::parse(&"b".repeat(MAX_TRACE_ID_LEN)).is_some());
        assert!(TraceId::parse("ünïcode").is_none());
        assert_eq!(TraceId::parse("abc-123").unwrap().as_str(), "abc-123");
    }
}

//! Request correlation and HTTP tracing.
//!
//! The request id travels in a tokio task-local while the handler runs, so
//! error bodies and response envelopes can echo it.

use axum::http::{HeaderMap, Request};
use std::fmt;
use std::future::Future;
use tower_http::classify::{SharedClassifier, StatusInRangeAsFailures};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
    MakeSpan, TraceLayer,
};
use tower_http::LatencyUnit;
use tracing::Level;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn generate() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }

    /// An inbound id from a till or proxy, if it is short printable ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
        let usable = !raw.is_empty()
            && raw.len() <= MAX_REQUEST_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_graphic());
        usable.then(|| RequestId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// Runs `future` with `request_id` visible to [`current_request_id`].
pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID.scope(request_id, future).await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID.try_with(RequestId::clone).ok()
}

/// Names the span after the request and tags it with the request id.
#[derive(Clone, Default)]
pub struct PosRequestSpan;

impl<B> MakeSpan<B> for PosRequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .or_else(|| RequestId::from_headers(request.headers()))
            .unwrap_or_else(RequestId::generate);

        tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<StatusInRangeAsFailures>,
    PosRequestSpan,
    DefaultOnRequest,
    DefaultOnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    DefaultOnFailure,
>;

/// Only 5xx responses count as failures; 4xx are ordinary business outcomes.
pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new(SharedClassifier::new(StatusInRangeAsFailures::new(500..=599)))
        .make_span_with(PosRequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_body_chunk(DefaultOnBodyChunk::new())
        .on_eos(DefaultOnEos::new())
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn request_id_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());

        let seen =
            scope_request_id(RequestId::new("scoped-1"), async { current_request_id() }).await;
        assert_eq!(seen, Some(RequestId::new("scoped-1")));

        assert!(current_request_id().is_none());
    }

    #[test]
    fn inbound_ids_must_be_short_and_printable() {
        let mut headers = HeaderMap::new();
        assert!(RequestId::from_headers(&headers).is_none());

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("till-3-0042"));
        assert_eq!(
            RequestId::from_headers(&headers),
            Some(RequestId::new("till-3-0042"))
        );

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("has space"));
        assert!(RequestId::from_headers(&headers).is_none());

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert!(RequestId::from_headers(&headers).is_none());
    }
}

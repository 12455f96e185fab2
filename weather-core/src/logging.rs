//! Logging setup and helpers.

use axum::{Router, http::Request};
use tower_http::{
    LatencyUnit,
    classify::{ServerErrorsAsFailures, SharedClassifier},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span, error, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::error::PipelineError;

/// Correlation header shared by the gateway and the resolver.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request span carrying the correlation id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdSpan;

impl<B> MakeSpan<B> for RequestIdSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request_id_of(request).unwrap_or("-");
        info_span!("request", method = %request.method(), uri = %request.uri(), request_id)
    }
}

fn request_id_of<B>(request: &Request<B>) -> Option<&str> {
    request.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// Per-request span and response logging for both services.
pub fn create_http_trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestIdSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(RequestIdSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

/// Assign an `x-request-id` when the caller sent none, open the request span
/// under it and echo it on the response.
pub fn with_request_tracing(router: Router) -> Router {
    router
        .layer(create_http_trace_layer())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Client mistakes are warnings; everything else is an error.
pub fn log_pipeline_error(error: &PipelineError, service: &str) {
    if error.is_client_error() {
        warn!(service, code = error.code(), status = %error.status(), error = %error, "Request rejected");
    } else {
        error!(service, code = error.code(), status = %error.status(), error = %error, "Request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_read_from_header() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(())
            .unwrap();
        assert_eq!(request_id_of(&request), Some("abc-123"));

        let request = Request::builder().body(()).unwrap();
        assert_eq!(request_id_of(&request), None);
    }
}

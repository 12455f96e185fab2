//! HTTP surface of the gateway and resolver services.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, State,
        rejection::{BytesRejection, FailedToBufferBody},
    },
    http::{HeaderMap, HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use std::{sync::Arc, time::Instant};

use crate::{
    Config,
    error::PipelineError,
    logging::{REQUEST_ID_HEADER, log_pipeline_error, with_request_tracing},
    pipeline::{GatewayPipeline, ResolverPipeline, encode_report},
    provider::{
        build_http_client, locality_provider_from_config,
        resolver::{Relay, ResolverForwarder},
        weather_provider_from_config,
    },
    telemetry::{MetricsSnapshot, RequestMetrics},
};

/// Inbound bodies are tiny; anything past this is not a lookup request.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Debug)]
pub struct GatewayState {
    pub pipeline: GatewayPipeline,
    pub metrics: RequestMetrics,
}

impl GatewayState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = build_http_client(config.forward_timeout())?;
        let forwarder = ResolverForwarder::new(config.resolver_url()?, http);
        Ok(Self { pipeline: GatewayPipeline::new(forwarder), metrics: RequestMetrics::new("gateway") })
    }
}

#[derive(Debug)]
pub struct ResolverState {
    pub pipeline: ResolverPipeline,
    pub metrics: RequestMetrics,
}

impl ResolverState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = build_http_client(config.request_timeout())?;
        let pipeline = ResolverPipeline::new(
            locality_provider_from_config(config, http.clone())?,
            weather_provider_from_config(config, http)?,
            config.request_budget(),
        );
        Ok(Self { pipeline, metrics: RequestMetrics::new("resolver") })
    }
}

pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    let router = Router::new()
        .route("/", any(gateway_handler))
        .route("/metrics", get(gateway_metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);
    with_request_tracing(router)
}

pub fn resolver_router(state: Arc<ResolverState>) -> Router {
    let router = Router::new()
        .route("/", any(resolver_handler))
        .route("/metrics", get(resolver_metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);
    with_request_tracing(router)
}

/// Handle `POST /` on the gateway.
async fn gateway_handler(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let response = match gateway_flow(&state, &method, &headers, body).await {
        Ok(response) => response,
        Err(err) => {
            log_pipeline_error(&err, "gateway");
            err.into_response()
        }
    };

    state.metrics.record(response.status(), started.elapsed());
    response
}

async fn gateway_flow(
    state: &GatewayState,
    method: &Method,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, PipelineError> {
    let body = buffered_body(body)?;
    let request_id = headers.get(REQUEST_ID_HEADER);

    match state.pipeline.handle(method, body, request_id).await? {
        Relay::Report(report) => Ok(json_response(StatusCode::OK, encode_report(&report)?)),
        Relay::Rejected { status, body } => Ok(json_response(status, body)),
    }
}

/// Handle `GET /` on the resolver.
async fn resolver_handler(
    State(state): State<Arc<ResolverState>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let response = match resolver_flow(&state, &method, body).await {
        Ok(response) => response,
        Err(err) => {
            log_pipeline_error(&err, "resolver");
            err.into_response()
        }
    };

    state.metrics.record(response.status(), started.elapsed());
    response
}

async fn resolver_flow(
    state: &ResolverState,
    method: &Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, PipelineError> {
    let body = buffered_body(body)?;

    let report = state.pipeline.handle(method, &body).await?;
    Ok(json_response(StatusCode::OK, encode_report(&report)?))
}

async fn gateway_metrics(State(state): State<Arc<GatewayState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn resolver_metrics(State(state): State<Arc<ResolverState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Bodies over [`MAX_BODY_BYTES`] are the client's fault; any other read failure is ours.
fn buffered_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, PipelineError> {
    body.map_err(|rejection| match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
            PipelineError::PayloadTooLarge { limit: MAX_BODY_BYTES }
        }
        other => PipelineError::BodyRead(other.body_text()),
    })
}

fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

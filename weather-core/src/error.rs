//! Failure taxonomy for the lookup pipeline and its mapping onto HTTP responses.
//!
//! Every variant is terminal for the request that produced it. The `Display`
//! text carries diagnostic detail for the log; clients only ever see
//! [`PipelineError::code`] and [`PipelineError::public_message`].

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::provider::UpstreamId;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("method not allowed, expected {allowed}")]
    MethodNotAllowed { allowed: Method },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("postal code must be 8 characters, got {length}")]
    InvalidPostalCode { length: usize },

    #[error("{upstream} unreachable: {source}")]
    UpstreamUnreachable {
        upstream: UpstreamId,
        #[source]
        source: reqwest::Error,
    },

    #[error("{upstream} did not answer before the deadline")]
    UpstreamTimeout { upstream: UpstreamId },

    #[error("request budget of {budget_ms} ms exhausted")]
    DeadlineExceeded { budget_ms: u128 },

    #[error("no locality matches the postal code")]
    LocalityNotFound,

    #[error("failed to parse locality response: {0}")]
    LocalityParseError(String),

    #[error("{upstream} responded with status {status}")]
    UpstreamError { upstream: UpstreamId, status: StatusCode },

    #[error("failed to parse {upstream} response: {reason}")]
    ResponseParseError { upstream: UpstreamId, reason: String },

    #[error("failed to decode resolver response: {0}")]
    ResponseDecodeError(String),

    #[error("weather API key is not configured")]
    MissingCredential,

    #[error("failed to encode response: {0}")]
    ResponseEncodeError(String),
}

impl PipelineError {
    /// Classify a reqwest failure; deadline expiry is reported separately.
    pub fn transport(upstream: UpstreamId, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::UpstreamTimeout { upstream }
        } else {
            Self::UpstreamUnreachable { upstream, source }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedBody(_) | Self::InvalidPostalCode { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::LocalityNotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout { .. } | Self::DeadlineExceeded { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Self::BodyRead(_)
            | Self::LocalityParseError(_)
            | Self::UpstreamError { .. }
            | Self::ResponseParseError { .. }
            | Self::ResponseDecodeError(_)
            | Self::MissingCredential
            | Self::ResponseEncodeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::BodyRead(_) => "BODY_READ_ERROR",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::MalformedBody(_) => "MALFORMED_BODY",
            Self::InvalidPostalCode { .. } => "INVALID_ZIPCODE",
            Self::UpstreamUnreachable { .. } => "UPSTREAM_UNREACHABLE",
            Self::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::LocalityNotFound => "ZIPCODE_NOT_FOUND",
            Self::LocalityParseError(_) => "LOCALITY_PARSE_ERROR",
            Self::UpstreamError { .. } => "UPSTREAM_ERROR",
            Self::ResponseParseError { .. } => "RESPONSE_PARSE_ERROR",
            Self::ResponseDecodeError(_) => "RESPONSE_DECODE_ERROR",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::ResponseEncodeError(_) => "RESPONSE_ENCODE_ERROR",
        }
    }

    /// Client-facing text, free of upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "Method not allowed",
            Self::BodyRead(_) => "Error reading request body",
            Self::PayloadTooLarge { .. } => "Request body too large",
            Self::MalformedBody(_) | Self::InvalidPostalCode { .. } => "Invalid zipcode",
            Self::UpstreamUnreachable { .. } | Self::UpstreamTimeout { .. } => {
                "Error reaching upstream service"
            }
            Self::DeadlineExceeded { .. } => "Request took too long",
            Self::LocalityNotFound => "Can not find zipcode",
            Self::LocalityParseError(_) => "Error parsing zipcode",
            Self::UpstreamError { .. } => "Error requesting weather",
            Self::ResponseParseError { .. } => "Error parsing weather",
            Self::ResponseDecodeError(_) => "Error parsing weather response",
            Self::MissingCredential => "Error finding weather api key",
            Self::ResponseEncodeError(_) => "Error returning weather response",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// JSON body rendered for every pipeline failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.code(), message: self.public_message() };
        let mut response = (self.status(), Json(body)).into_response();

        if let Self::MethodNotAllowed { allowed } = &self
            && let Ok(value) = allowed.as_str().parse::<HeaderValue>()
        {
            response.headers_mut().insert(header::ALLOW, value);
        }

        response
    }
}

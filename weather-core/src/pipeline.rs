//! Request orchestration for both services.
//!
//! Stages run strictly in order and the first failure ends the request.

use axum::{
    body::Bytes,
    http::{HeaderValue, Method},
};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::{
    error::PipelineError,
    model::{PostalCodeRequest, WeatherReport},
    provider::{
        LocalityProvider, WeatherProvider,
        resolver::{Relay, ResolverForwarder},
    },
    validate,
};

/// Validates at the front door and relays to the resolver service.
#[derive(Debug)]
pub struct GatewayPipeline {
    forwarder: ResolverForwarder,
}

impl GatewayPipeline {
    pub const METHOD: Method = Method::POST;

    pub fn new(forwarder: ResolverForwarder) -> Self {
        Self { forwarder }
    }

    /// Validate the request, then forward the untouched bytes.
    pub async fn handle(
        &self,
        method: &Method,
        body: Bytes,
        request_id: Option<&HeaderValue>,
    ) -> Result<Relay, PipelineError> {
        debug!("Validating request");
        validate::validate_request(method, &Self::METHOD, &body)?;

        debug!("Forwarding to resolver");
        self.forwarder.forward(body, request_id).await
    }
}

/// Locality lookup followed by weather lookup, both inside one request budget.
#[derive(Debug)]
pub struct ResolverPipeline {
    locality: Box<dyn LocalityProvider>,
    weather: Box<dyn WeatherProvider>,
    budget: Duration,
}

impl ResolverPipeline {
    pub const METHOD: Method = Method::GET;

    pub fn new(
        locality: Box<dyn LocalityProvider>,
        weather: Box<dyn WeatherProvider>,
        budget: Duration,
    ) -> Self {
        Self { locality, weather, budget }
    }

    pub async fn handle(&self, method: &Method, body: &[u8]) -> Result<WeatherReport, PipelineError> {
        debug!("Validating zipcode");
        let request = validate::validate_request(method, &Self::METHOD, body)?;
        self.run(&request).await
    }

    /// Each stage gets whatever is left of the budget when it starts.
    pub async fn run(&self, request: &PostalCodeRequest) -> Result<WeatherReport, PipelineError> {
        let deadline = Instant::now() + self.budget;

        debug!(zipcode = %request.code, "Resolving locality");
        let locality = self.within(deadline, self.locality.resolve_locality(request)).await?;

        debug!(locality = %locality.locality_name, "Resolving weather");
        self.within(deadline, self.weather.current_weather(&locality)).await
    }

    async fn within<T, F>(&self, deadline: Instant, stage: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        timeout_at(deadline, stage)
            .await
            .map_err(|_| PipelineError::DeadlineExceeded { budget_ms: self.budget.as_millis() })?
    }
}

/// Serialize the final report for the response body.
pub fn encode_report(report: &WeatherReport) -> Result<Bytes, PipelineError> {
    serde_json::to_vec(report)
        .map(Bytes::from)
        .map_err(|e| PipelineError::ResponseEncodeError(e.to_string()))
}

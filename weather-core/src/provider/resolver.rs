use axum::body::Bytes;
use reqwest::{
    Client, StatusCode, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use tracing::{debug, warn};

use crate::{error::PipelineError, logging::REQUEST_ID_HEADER, model::WeatherReport};

use super::{UpstreamId, truncate_body};

/// What the resolver handed back to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Relay {
    Report(WeatherReport),
    /// Non-success JSON answer, passed to the client with its original status and body.
    Rejected { status: StatusCode, body: Bytes },
}

/// Gateway-side client that forwards validated lookups to the resolver service.
#[derive(Debug, Clone)]
pub struct ResolverForwarder {
    resolver_url: Url,
    http: Client,
}

impl ResolverForwarder {
    pub fn new(resolver_url: Url, http: Client) -> Self {
        Self { resolver_url, http }
    }

    /// Send the original request body as-is; one call, no retries.
    ///
    /// `request_id` is passed on so both hops log under the same id.
    pub async fn forward(
        &self,
        body: Bytes,
        request_id: Option<&HeaderValue>,
    ) -> Result<Relay, PipelineError> {
        debug!(upstream = %UpstreamId::Resolver, url = %self.resolver_url, "Forwarding request");

        let mut request = self
            .http
            .get(self.resolver_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(id) = request_id {
            request = request.header(REQUEST_ID_HEADER, id.clone());
        }

        let res = request
            .send()
            .await
            .map_err(|e| PipelineError::transport(UpstreamId::Resolver, e))?;

        let status = res.status();
        let is_json = is_json(res.headers());
        let body = res.bytes().await.map_err(|e| PipelineError::ResponseDecodeError(e.to_string()))?;

        if !status.is_success() {
            warn!(
                upstream = %UpstreamId::Resolver,
                %status,
                body = %truncate_body(&body),
                "Resolver rejected request"
            );
            if !is_json {
                return Err(PipelineError::UpstreamError { upstream: UpstreamId::Resolver, status });
            }
            return Ok(Relay::Rejected { status, body });
        }

        let report: WeatherReport = serde_json::from_slice(&body)
            .map_err(|e| PipelineError::ResponseDecodeError(e.to_string()))?;

        Ok(Relay::Report(report))
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

use anyhow::bail;
use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::PipelineError,
    model::{LocalityResult, PostalCodeRequest},
};

use super::{LocalityProvider, UpstreamId, truncate_body};

/// Client for a ViaCEP-style lookup service (`GET <base>/<code>/json/`).
#[derive(Debug, Clone)]
pub struct ViaCepProvider {
    base_url: Url,
    http: Client,
}

impl ViaCepProvider {
    pub fn new(base_url: Url, http: Client) -> anyhow::Result<Self> {
        if base_url.cannot_be_a_base() {
            bail!("Locality URL cannot take path segments: {base_url}");
        }
        Ok(Self { base_url, http })
    }

    /// The code is pushed as an encoded segment so it can never escape the path.
    fn lookup_url(&self, code: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(code).push("json").push("");
        }
        url
    }
}

/// `erro` has shipped both as a string and as a boolean.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorFlag {
    Flag(bool),
    Text(String),
}

impl ErrorFlag {
    fn is_set(&self) -> bool {
        match self {
            ErrorFlag::Flag(flag) => *flag,
            ErrorFlag::Text(text) => !text.is_empty(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    erro: Option<ErrorFlag>,
}

impl ViaCepResponse {
    fn into_locality(self) -> LocalityResult {
        let flagged = self.erro.as_ref().is_some_and(ErrorFlag::is_set);
        if flagged || self.localidade.is_empty() {
            LocalityResult::not_found()
        } else {
            LocalityResult::found(self.localidade)
        }
    }
}

#[async_trait]
impl LocalityProvider for ViaCepProvider {
    async fn resolve_locality(
        &self,
        request: &PostalCodeRequest,
    ) -> Result<LocalityResult, PipelineError> {
        let url = self.lookup_url(&request.code);
        debug!(upstream = %UpstreamId::Locality, %url, "Requesting locality");

        let res = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| PipelineError::transport(UpstreamId::Locality, e))?;

        let status = res.status();
        let body = res.bytes().await.map_err(|e| PipelineError::transport(UpstreamId::Locality, e))?;

        if !status.is_success() {
            warn!(
                upstream = %UpstreamId::Locality,
                %status,
                body = %truncate_body(&body),
                "Locality lookup failed"
            );
            return Err(PipelineError::LocalityNotFound);
        }

        let parsed: ViaCepResponse = serde_json::from_slice(&body)
            .map_err(|e| PipelineError::LocalityParseError(e.to_string()))?;

        let locality = parsed.into_locality();
        if !locality.found {
            debug!(zipcode = %request.code, "Postal code has no locality");
            return Err(PipelineError::LocalityNotFound);
        }

        Ok(locality)
    }
}

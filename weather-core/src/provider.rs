use crate::{
    Config, LocalityResult, PostalCodeRequest, WeatherReport,
    error::PipelineError,
    provider::{viacep::ViaCepProvider, weatherapi::WeatherApiProvider},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

pub mod resolver;
pub mod viacep;
pub mod weatherapi;

/// Outbound dependencies the services talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamId {
    Resolver,
    Locality,
    Weather,
}

impl UpstreamId {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamId::Resolver => "resolver",
            UpstreamId::Locality => "locality",
            UpstreamId::Weather => "weather",
        }
    }
}

impl std::fmt::Display for UpstreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal code -> locality name.
#[async_trait]
pub trait LocalityProvider: Send + Sync + Debug {
    async fn resolve_locality(
        &self,
        request: &PostalCodeRequest,
    ) -> Result<LocalityResult, PipelineError>;
}

/// Locality name -> current weather.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, locality: &LocalityResult)
    -> Result<WeatherReport, PipelineError>;
}

/// Shared outbound client; every call carries `timeout` as its deadline.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build outbound HTTP client")
}

pub fn locality_provider_from_config(
    config: &Config,
    http: Client,
) -> anyhow::Result<Box<dyn LocalityProvider>> {
    Ok(Box::new(ViaCepProvider::new(config.locality_url()?, http)?))
}

/// The API key is optional here: its absence surfaces per request.
pub fn weather_provider_from_config(
    config: &Config,
    http: Client,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.weather_api_key().map(str::to_owned);
    Ok(Box::new(WeatherApiProvider::new(config.weather_url()?, api_key, http)))
}

/// Shorten an upstream body for log output.
pub(crate) fn truncate_body(body: &[u8]) -> String {
    const MAX: usize = 200;
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_display_matches_as_str() {
        for id in [UpstreamId::Resolver, UpstreamId::Locality, UpstreamId::Weather] {
            assert_eq!(id.to_string(), id.as_str());
        }
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "ã".repeat(300);
        let short = truncate_body(body.as_bytes());

        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 203);
        assert_eq!(truncate_body(b"short"), "short");
    }

    #[test]
    fn providers_build_from_default_config() {
        let cfg = Config::default();
        let http = build_http_client(cfg.request_timeout()).unwrap();

        assert!(locality_provider_from_config(&cfg, http.clone()).is_ok());
        assert!(weather_provider_from_config(&cfg, http).is_ok());
    }

    #[test]
    fn provider_from_config_rejects_bad_url() {
        let cfg = Config { locality_url: "::".into(), ..Config::default() };
        let http = build_http_client(Config::default().request_timeout()).unwrap();

        assert!(locality_provider_from_config(&cfg, http).is_err());
    }
}

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::PipelineError,
    model::{LocalityResult, WeatherReport},
};

use super::{UpstreamId, WeatherProvider, truncate_body};

/// Client for WeatherAPI.com's current-conditions endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    endpoint: Url,
    api_key: Option<String>,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(endpoint: Url, api_key: Option<String>, http: Client) -> Self {
        Self { endpoint, api_key, http }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    temp_f: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

impl From<WaResponse> for WeatherReport {
    fn from(parsed: WaResponse) -> Self {
        WeatherReport::from_reading(parsed.location.name, parsed.current.temp_c, parsed.current.temp_f)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current_weather(
        &self,
        locality: &LocalityResult,
    ) -> Result<WeatherReport, PipelineError> {
        if !locality.found {
            return Err(PipelineError::LocalityNotFound);
        }

        // Checked before any network traffic.
        let api_key = self.api_key.as_deref().ok_or(PipelineError::MissingCredential)?;

        debug!(upstream = %UpstreamId::Weather, locality = %locality.locality_name, "Requesting weather");

        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[("q", locality.locality_name.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .header("key", api_key)
            .send()
            .await
            .map_err(|e| PipelineError::transport(UpstreamId::Weather, e))?;

        let status = res.status();
        let body = res.bytes().await.map_err(|e| PipelineError::transport(UpstreamId::Weather, e))?;

        if !status.is_success() {
            warn!(
                upstream = %UpstreamId::Weather,
                %status,
                body = %truncate_body(&body),
                "Weather request failed"
            );
            return Err(PipelineError::UpstreamError { upstream: UpstreamId::Weather, status });
        }

        let parsed: WaResponse =
            serde_json::from_slice(&body).map_err(|e| PipelineError::ResponseParseError {
                upstream: UpstreamId::Weather,
                reason: e.to_string(),
            })?;

        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<WeatherReport, serde_json::Error> {
        serde_json::from_str::<WaResponse>(json).map(Into::into)
    }

    #[test]
    fn nested_fields_map_onto_report() {
        let report = parse(
            r#"{"location":{"name":"Sao Paulo","region":"SP"},"current":{"temp_c":25.0,"temp_f":77.0,"humidity":60}}"#,
        )
        .unwrap();

        assert_eq!(report, WeatherReport::from_reading("Sao Paulo", 25.0, 77.0));
        assert_eq!(report.temperature_kelvin, 298.0);
    }

    #[test]
    fn integer_temperatures_are_accepted() {
        let report = parse(r#"{"location":{"name":"Curitiba"},"current":{"temp_c":-3,"temp_f":27}}"#)
            .unwrap();
        assert_eq!(report.temperature_kelvin, 270.0);
    }

    #[test]
    fn missing_or_mistyped_fields_fail() {
        for json in [
            r#"{"location":{"name":"Sao Paulo"}}"#,
            r#"{"location":{},"current":{"temp_c":25.0,"temp_f":77.0}}"#,
            r#"{"location":{"name":"Sao Paulo"},"current":{"temp_c":"25","temp_f":77.0}}"#,
            r#"{"location":"Sao Paulo","current":{"temp_c":25.0,"temp_f":77.0}}"#,
            r#"[]"#,
        ] {
            assert!(parse(json).is_err(), "{json}");
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Port 9 (discard) is never contacted: the credential check comes first.
        let provider = WeatherApiProvider::new(
            Url::parse("http://127.0.0.1:9/v1/current.json").unwrap(),
            None,
            Client::new(),
        );

        let err = provider.current_weather(&LocalityResult::found("Recife")).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingCredential));
    }

    #[tokio::test]
    async fn unresolved_locality_is_not_queried() {
        let provider = WeatherApiProvider::new(
            Url::parse("http://127.0.0.1:9/v1/current.json").unwrap(),
            Some("KEY".into()),
            Client::new(),
        );

        let err = provider.current_weather(&LocalityResult::not_found()).await.unwrap_err();
        assert!(matches!(err, PipelineError::LocalityNotFound));
    }
}

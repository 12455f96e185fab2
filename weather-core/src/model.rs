use serde::{Deserialize, Serialize};

/// Exact number of characters a postal code must have.
pub const POSTAL_CODE_LEN: usize = 8;

/// Offset used to derive Kelvin from Celsius. Deliberately the rounded value.
pub const KELVIN_OFFSET: f64 = 273.0;

/// Inbound lookup request, `{"zipcode": "..."}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCodeRequest {
    #[serde(rename = "zipcode")]
    pub code: String,
}

impl PostalCodeRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Locality resolved for a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalityResult {
    /// Empty unless `found` is set.
    pub locality_name: String,
    pub found: bool,
}

impl LocalityResult {
    pub fn found(locality_name: impl Into<String>) -> Self {
        Self { locality_name: locality_name.into(), found: true }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Composed response returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    #[serde(rename = "temp_c")]
    pub temperature_celsius: f64,
    #[serde(rename = "temp_f")]
    pub temperature_fahrenheit: f64,
    #[serde(rename = "temp_k")]
    pub temperature_kelvin: f64,
}

impl WeatherReport {
    /// Build a report from one upstream reading; Kelvin is always derived from Celsius.
    pub fn from_reading(city: impl Into<String>, celsius: f64, fahrenheit: f64) -> Self {
        Self {
            city: city.into(),
            temperature_celsius: celsius,
            temperature_fahrenheit: fahrenheit,
            temperature_kelvin: celsius + KELVIN_OFFSET,
        }
    }
}

use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

pub const DEFAULT_RESOLVER_URL: &str = "http://resolver:8181";
pub const DEFAULT_LOCALITY_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_WEATHER_URL: &str = "https://api.weatherapi.com/v1/current.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Sequential outbound calls a resolver request makes.
const RESOLVER_STAGES: u32 = 2;

/// Extra room the gateway leaves on top of the resolver's budget.
pub const FORWARD_GRACE: Duration = Duration::from_secs(1);

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_CONFIG";

/// Service configuration.
///
/// Example TOML:
/// resolver_url = "http://resolver:8181"
/// weather_api_key = "..."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL the gateway forwards to.
    pub resolver_url: String,

    /// Postal-code lookup service; the code is appended as `/<code>/json/`.
    pub locality_url: String,

    /// Current-weather endpoint, queried with `?q=<locality>`.
    pub weather_url: String,

    /// Sent as the `key` header. No default.
    pub weather_api_key: Option<String>,

    /// Deadline for each outbound call.
    pub request_timeout_secs: u64,

    /// Whole-request budget on the resolver. Defaults to one timeout per stage.
    pub request_budget_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            locality_url: DEFAULT_LOCALITY_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            request_budget_secs: None,
        }
    }
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;

        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Apply `RESOLVER_URL`, `LOCALITY_URL`, `WEATHER_URL`, `WEATHER_API_KEY`,
    /// `REQUEST_TIMEOUT_SECS` and `REQUEST_BUDGET_SECS` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RESOLVER_URL") {
            self.resolver_url = url;
        }
        if let Some(url) = lookup("LOCALITY_URL") {
            self.locality_url = url;
        }
        if let Some(url) = lookup("WEATHER_URL") {
            self.weather_url = url;
        }
        if let Some(key) = lookup("WEATHER_API_KEY") {
            self.weather_api_key = Some(key);
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS is not a number: {secs}"))?;
        }
        if let Some(secs) = lookup("REQUEST_BUDGET_SECS") {
            let secs = secs
                .trim()
                .parse()
                .with_context(|| format!("REQUEST_BUDGET_SECS is not a number: {secs}"))?;
            self.request_budget_secs = Some(secs);
        }
        Ok(())
    }

    /// Path to the config file: `$WEATHER_CONFIG`, else the platform config dir.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("dev", "weather-task", "weather-service")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Reject unusable URLs and a zero timeout. A missing API key is allowed
    /// here; the resolver reports it per request.
    pub fn validate(&self) -> Result<()> {
        self.resolver_url()?;
        self.locality_url()?;
        self.weather_url()?;

        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.request_budget_secs == Some(0) {
            bail!("request_budget_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn resolver_url(&self) -> Result<Url> {
        parse_base_url("resolver_url", &self.resolver_url)
    }

    pub fn locality_url(&self) -> Result<Url> {
        parse_base_url("locality_url", &self.locality_url)
    }

    pub fn weather_url(&self) -> Result<Url> {
        parse_base_url("weather_url", &self.weather_url)
    }

    /// Returns the API key; an empty value counts as missing.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather_api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Total time the resolver may spend on one request across both stages.
    pub fn request_budget(&self) -> Duration {
        match self.request_budget_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.request_timeout() * RESOLVER_STAGES,
        }
    }

    /// Gateway deadline for the forwarded call; always outlasts the resolver budget.
    pub fn forward_timeout(&self) -> Duration {
        self.request_budget() + FORWARD_GRACE
    }
}

fn parse_base_url(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("Invalid {name}: {value}"))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Invalid {name}: {value} (expected an http or https URL)");
    }
    Ok(url)
}

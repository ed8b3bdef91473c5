//! HTTP client for the Open-Meteo forecast endpoint

use anyhow::{Context, Result};
use meto_core::{FetchError, FetchRequest, Fetcher};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const OPEN_METEO_FORECAST: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly variables requested from the upstream
pub const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m";

/// Fetches hourly forecasts, including past days, for a single point
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: Url,
}

impl OpenMeteoClient {
    const USER_AGENT: &'static str = concat!("metod/", env!("CARGO_PKG_VERSION"));

    /// Create a client whose requests are bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid upstream URL: {}", base_url))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Fetcher for OpenMeteoClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        debug!(message = "making forecast request", url = %self.base_url, location = %request.location);

        let res = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("latitude", request.location.latitude.to_string()),
                ("longitude", request.location.longitude.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("past_days", request.past_days.to_string()),
                ("timezone", request.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

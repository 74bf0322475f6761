use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::ProviderError;

use super::{ProviderId, WeatherProvider, missing_credentials, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const NAME: &str = "OpenWeather";

/// Current conditions from OpenWeather (`/data/2.5/weather`, metric units).
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Point the provider at another host (e.g. a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<serde_json::Value, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(missing_credentials(self.id()));
        }

        tracing::info!(location, provider = NAME, "Fetching weather from upstream");

        let url = format!("{}/data/2.5/weather", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Http { provider: NAME.to_string(), source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Http { provider: NAME.to_string(), source })?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|source| ProviderError::Decode { provider: NAME.to_string(), source });
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized {
                provider: self.id().to_string(),
                body: truncate_body(&body),
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound { location: location.to_string() });
        }

        Err(ProviderError::Status {
            provider: NAME.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }
}

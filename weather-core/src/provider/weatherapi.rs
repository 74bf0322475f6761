use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::ProviderError;

use super::{ProviderId, WeatherProvider, missing_credentials, truncate_body};

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";
const NAME: &str = "WeatherAPI";

/// WeatherAPI.com error code for "No matching location found."
const NO_MATCHING_LOCATION: u32 = 1006;

/// Current conditions from WeatherAPI.com (`/v1/current.json`).
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(api_key, Client::new())
    }

    pub fn with_client(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    error: WaError,
}

#[derive(Debug, Deserialize)]
struct WaError {
    code: u32,
}

fn error_code(body: &str) -> Option<u32> {
    serde_json::from_str::<WaErrorBody>(body).ok().map(|b| b.error.code)
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch(&self, location: &str) -> Result<serde_json::Value, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(missing_credentials(self.id()));
        }

        tracing::info!(location, provider = NAME, "Fetching weather from upstream");

        let url = format!("{}/v1/current.json", self.base_url);
        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", location)])
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

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized {
                provider: self.id().to_string(),
                body: truncate_body(&body),
            });
        }

        if status == StatusCode::BAD_REQUEST && error_code(&body) == Some(NO_MATCHING_LOCATION) {
            return Err(ProviderError::NotFound { location: location.to_string() });
        }

        Err(ProviderError::Status {
            provider: NAME.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> WeatherApiProvider {
        WeatherApiProvider::new("wa-key".to_string()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn fetch_returns_current_document() {
        let server = MockServer::start().await;
        let doc = serde_json::json!({
            "location": {"name": "Berlin", "country": "Germany"},
            "current": {"temp_c": 4.0, "condition": {"text": "Overcast"}}
        });

        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .and(query_param("key", "wa-key"))
            .and(query_param("q", "Berlin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc.clone()))
            .mount(&server)
            .await;

        assert_eq!(provider(&server).fetch("Berlin").await.unwrap(), doc);
    }

    #[tokio::test]
    async fn no_matching_location_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 1006, "message": "No matching location found."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Nowhereville").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn other_bad_request_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 1003, "message": "Parameter q is missing."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 400, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn disabled_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 2008, "message": "API key has been disabled."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { .. }), "got {err:?}");
    }

    #[test]
    fn error_code_ignores_unrelated_bodies() {
        assert_eq!(error_code("not json"), None);
        assert_eq!(error_code(r#"{"error":{"code":1006}}"#), Some(1006));
    }
}

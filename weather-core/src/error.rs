use thiserror::Error;

/// Failure of a weather lookup, surfaced to the caller.
///
/// Cache problems never show up here; they are absorbed by [`crate::cache::SafeCache`].
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),
}

/// Transport-neutral classification of a [`RetrievalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    NotFound,
    Upstream,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Validation(_) => ErrorKind::Validation,
            RetrievalError::Configuration(_) => ErrorKind::Configuration,
            RetrievalError::NotFound(_) => ErrorKind::NotFound,
            RetrievalError::Upstream(_) => ErrorKind::Upstream,
        }
    }
}

/// Errors reported by a [`crate::provider::WeatherProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key configured for provider '{0}'")]
    MissingCredentials(String),

    #[error("Invalid API key for provider '{provider}': {body}")]
    Unauthorized { provider: String, body: String },

    #[error("Location \"{location}\" not found")]
    NotFound { location: String },

    #[error("Failed to send request to {provider}: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed with status {status}: {body}")]
    Status { provider: String, status: u16, body: String },

    #[error("Failed to parse {provider} JSON: {source}")]
    Decode {
        provider: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ProviderError> for RetrievalError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredentials(_) | ProviderError::Unauthorized { .. } => {
                RetrievalError::Configuration(err.to_string())
            }
            ProviderError::NotFound { .. } => RetrievalError::NotFound(err.to_string()),
            ProviderError::Http { .. }
            | ProviderError::Status { .. }
            | ProviderError::Decode { .. } => {
                RetrievalError::Upstream(format!("Failed to fetch weather data from API: {err}"))
            }
        }
    }
}

/// Errors raised by a [`crate::cache::CacheBackend`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

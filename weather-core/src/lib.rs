//! Core library for the `weather-cache` service.
//!
//! This crate defines:
//! - Cache-aside retrieval of weather data ([`WeatherService`])
//! - Cache backends (Redis, in-memory) behind a facade that never fails
//! - Process-wide hit/miss/error statistics
//! - Abstraction over upstream weather providers
//! - Configuration & credentials handling
//!
//! It is used by the `weather-cache` binary, but can also be embedded behind
//! any other front-end (HTTP, RPC) that maps [`RetrievalError`] to its own
//! status codes.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod stats;

pub use cache::{CacheBackend, ConnectionState, ConnectionSupervisor, SafeCache, DEFAULT_TTL_SECS};
pub use config::{CacheBackendKind, CacheConfig, Config, ProviderConfig};
pub use error::{CacheError, ErrorKind, ProviderError, RetrievalError};
pub use model::{CacheKey, Source, StatsReport, WeatherResult};
pub use provider::{ProviderId, WeatherProvider};
pub use service::WeatherService;
pub use stats::CacheStats;

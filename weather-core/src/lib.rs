//! Core library for the `weather` tools.
//!
//! This crate defines:
//! - Configuration & credentials handling (config file + environment)
//! - Two weather lookups exposed as tools: `weather-data` (US, via geocode.xyz
//!   and api.weather.gov) and `qweather-data` (China, via QWeather)
//! - Shared domain models and the error taxonomy
//!
//! It is used by `weather-cli`, but any orchestration layer can drive the
//! providers through [`WeatherProvider::invoke`].

pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use config::{Config, Credential, Endpoints};
pub use error::{Stage, WeatherError};
pub use model::{CnWeatherQuery, CnWeatherResult, UsWeatherQuery, UsWeatherResult};
pub use provider::{
    ProviderId, ToolDefinition, WeatherProvider, all_providers, nws::NwsProvider,
    provider_from_config, qweather::QWeatherProvider,
};

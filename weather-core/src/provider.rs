use crate::{
    Config, WeatherError,
    error::Stage,
    provider::{nws::NwsProvider, qweather::QWeatherProvider},
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{convert::TryFrom, fmt::Debug};

pub mod nws;
pub mod qweather;

const USER_AGENT: &str = concat!("weather-tools/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Nws,
    QWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Nws => "nws",
            ProviderId::QWeather => "qweather",
        }
    }

    /// Name under which the provider is exposed as a tool.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ProviderId::Nws => "weather-data",
            ProviderId::QWeather => "qweather-data",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::Nws => "GEOCODE_API_KEY",
            ProviderId::QWeather => "QWEATHER_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Nws, ProviderId::QWeather]
    }

    pub(crate) fn missing_key(&self) -> WeatherError {
        WeatherError::MissingApiKey {
            var: self.api_key_env(),
            provider: self.as_str(),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == lower || id.tool_name() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown provider '{value}'. Supported: nws (weather-data), qweather (qweather-data)."
                )
            })
    }
}

/// What an orchestration layer needs to advertise a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments accepted by [`WeatherProvider::invoke`].
    fn input_schema(&self) -> Value;

    /// Run the lookup with untyped arguments and return the result as JSON.
    async fn invoke(&self, args: Value) -> Result<Value, WeatherError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.id().tool_name(),
            description: self.description(),
            parameters: self.input_schema(),
        }
    }
}

/// Construct a provider from config and explicit ProviderId.
///
/// A missing API key is not an error here; it surfaces when the tool is invoked.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> Result<Box<dyn WeatherProvider>, WeatherError> {
    let http = http_client(config)?;
    let api_key = config.api_key(id).map(str::to_owned);

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::Nws => Box::new(NwsProvider::new(api_key, config.endpoints.clone(), http)),
        ProviderId::QWeather => {
            Box::new(QWeatherProvider::new(api_key, config.endpoints.clone(), http))
        }
    };

    Ok(boxed)
}

/// Every known provider, in [`ProviderId::all`] order.
pub fn all_providers(config: &Config) -> Result<Vec<Box<dyn WeatherProvider>>, WeatherError> {
    ProviderId::all()
        .iter()
        .map(|id| provider_from_config(*id, config))
        .collect()
}

pub fn http_client(config: &Config) -> Result<Client, WeatherError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout())
        .build()
        .map_err(WeatherError::Client)
}

pub(crate) fn parse_url(stage: Stage, raw: &str) -> Result<Url, WeatherError> {
    Url::parse(raw).map_err(|source| WeatherError::InvalidUrl {
        stage,
        url: raw.to_string(),
        source,
    })
}

/// `base` with each of `segments` appended as one percent-encoded path segment.
pub(crate) fn join_segments(
    stage: Stage,
    base: &str,
    segments: &[&str],
) -> Result<Url, WeatherError> {
    let mut joined = parse_url(stage, base)?;
    joined
        .path_segments_mut()
        .map_err(|()| WeatherError::InvalidUrl {
            stage,
            url: base.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(joined)
}

/// GET `url`, fail on non-success status, decode the body as `T`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    stage: Stage,
    url: Url,
) -> Result<T, WeatherError> {
    tracing::debug!(
        %stage,
        host = url.host_str().unwrap_or_default(),
        path = url.path(),
        "sending request"
    );

    let res = http
        .get(url)
        .send()
        .await
        .map_err(|e| WeatherError::Transport { stage, source: e.without_url() })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| WeatherError::Transport { stage, source: e.without_url() })?;

    if !status.is_success() {
        tracing::warn!(%stage, %status, "{}", stage.notice());
        return Err(WeatherError::Upstream {
            stage,
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| WeatherError::data_shape(stage, e.to_string()))
}

/// Decode only the first element of `entries`; later elements are never read.
pub(crate) fn first_entry<T: DeserializeOwned>(
    stage: Stage,
    entries: Vec<Value>,
    empty: &str,
) -> Result<T, WeatherError> {
    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::data_shape(stage, empty))?;
    serde_json::from_value(first).map_err(|e| WeatherError::data_shape(stage, e.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

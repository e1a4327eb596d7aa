use std::fmt;

use thiserror::Error;

/// One outbound call in a lookup pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Geocode,
    PointsMetadata,
    Forecast,
    LocationLookup,
    WeatherNow,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Geocode => "geocode lookup",
            Stage::PointsMetadata => "weather metadata lookup",
            Stage::Forecast => "forecast lookup",
            Stage::LocationLookup => "location lookup",
            Stage::WeatherNow => "weather lookup",
        }
    }

    /// Diagnostic notice logged before an upstream failure is returned.
    pub fn notice(&self) -> &'static str {
        match self {
            Stage::Geocode => "No geocode data found.",
            Stage::PointsMetadata | Stage::WeatherNow => "No weather data found.",
            Stage::Forecast => "No forecast data found.",
            Stage::LocationLookup => "No location data found.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Missing {var} secret.\nHint: export {var} or run `weather configure {provider}`.")]
    MissingApiKey {
        var: &'static str,
        provider: &'static str,
    },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error("{stage} failed with status {status}: {body}")]
    Upstream {
        stage: Stage,
        status: u16,
        body: String,
    },

    #[error("{stage} failed: provider answered with code {code}")]
    Rejected { stage: Stage, code: String },

    #[error("{stage} failed: unexpected response ({detail})")]
    DataShape { stage: Stage, detail: String },

    #[error("{stage} failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} failed: invalid url {url}")]
    InvalidUrl {
        stage: Stage,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to encode tool result")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl WeatherError {
    /// The pipeline stage that failed, if the error came from a network step.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WeatherError::Upstream { stage, .. }
            | WeatherError::Rejected { stage, .. }
            | WeatherError::DataShape { stage, .. }
            | WeatherError::Transport { stage, .. }
            | WeatherError::InvalidUrl { stage, .. } => Some(*stage),
            WeatherError::MissingApiKey { .. }
            | WeatherError::InvalidArguments(_)
            | WeatherError::Encode(_)
            | WeatherError::Client(_) => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, WeatherError::MissingApiKey { .. })
    }

    pub(crate) fn data_shape(stage: Stage, detail: impl Into<String>) -> Self {
        WeatherError::DataShape {
            stage,
            detail: detail.into(),
        }
    }
}

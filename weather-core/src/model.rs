use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_country() -> String {
    "usa".to_string()
}

/// Input of the `weather-data` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UsWeatherQuery {
    /// The city name to get weather for
    pub city: String,
    /// The two letter state abbreviation to get weather for
    pub state: String,
    /// The two letter country abbreviation to get weather for
    #[serde(default = "default_country")]
    pub country: String,
}

impl UsWeatherQuery {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            country: default_country(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

/// Input of the `qweather-data` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CnWeatherQuery {
    /// 城市名称
    pub city: String,
    /// 城市的上级行政区划，如 location=朝阳&adm=北京 时只返回北京市的朝阳区，而不包括辽宁省的朝阳市
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
}

impl CnWeatherQuery {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            adm: None,
        }
    }

    pub fn with_adm(mut self, adm: impl Into<String>) -> Self {
        self.adm = Some(adm.into());
        self
    }
}

/// A latitude or longitude exactly as the geocoder wrote it.
///
/// geocode.xyz answers with strings, other deployments with numbers; both are
/// kept verbatim so the points URL embeds the same digits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Text(s) => f.write_str(s.trim()),
            Coordinate::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeResult {
    pub latt: Coordinate,
    pub longt: Coordinate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPeriod {
    pub temperature: Value,
}

/// Output of the `weather-data` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsWeatherResult {
    pub city: String,
    pub state: String,
    pub country: String,
    pub temperature: Value,
}

/// Output of the `qweather-data` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnWeatherResult {
    pub city: String,
    pub temperature: Value,
    pub weather: String,
}

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    WeatherError,
    config::Endpoints,
    error::Stage,
    model::{CnWeatherQuery, CnWeatherResult},
    provider::{ProviderId, first_entry, get_json, join_segments},
};

use super::WeatherProvider;

/// QWeather (和风天气) GeoAPI city lookup followed by the real-time weather endpoint.
#[derive(Debug, Clone)]
pub struct QWeatherProvider {
    api_key: Option<String>,
    endpoints: Endpoints,
    http: Client,
}

impl QWeatherProvider {
    pub fn new(api_key: Option<String>, endpoints: Endpoints, http: Client) -> Self {
        Self {
            api_key,
            endpoints,
            http,
        }
    }

    pub async fn lookup(&self, query: &CnWeatherQuery) -> Result<CnWeatherResult, WeatherError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderId::QWeather.missing_key())?;

        let lookup: LookupResponse = get_json(
            &self.http,
            Stage::LocationLookup,
            self.location_url(api_key, query)?,
        )
        .await?;
        ensure_ok(Stage::LocationLookup, lookup.code.as_deref())?;

        let location: QwLocation =
            first_entry(Stage::LocationLookup, lookup.location, "no matching location")?;
        tracing::debug!(city = %query.city, id = %location.id, "resolved location");

        let weather: NowResponse = get_json(
            &self.http,
            Stage::WeatherNow,
            self.weather_url(api_key, &location.id)?,
        )
        .await?;
        ensure_ok(Stage::WeatherNow, weather.code.as_deref())?;

        let now = weather
            .now
            .ok_or_else(|| WeatherError::data_shape(Stage::WeatherNow, "missing field `now`"))?;

        tracing::info!(city = %query.city, "current conditions retrieved");

        Ok(CnWeatherResult {
            city: query.city.clone(),
            temperature: now.temp,
            weather: now.text,
        })
    }

    /// `{qweather_geo}/v2/city/lookup?location={city}[&adm={adm}]&key={key}`
    pub fn location_url(&self, api_key: &str, query: &CnWeatherQuery) -> Result<Url, WeatherError> {
        let mut url = join_segments(
            Stage::LocationLookup,
            &self.endpoints.qweather_geo,
            &["v2", "city", "lookup"],
        )?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("location", &query.city);
            if let Some(adm) = query.adm.as_deref().filter(|a| !a.is_empty()) {
                pairs.append_pair("adm", adm);
            }
            pairs.append_pair("key", api_key);
        }

        Ok(url)
    }

    /// `{qweather_api}/v7/weather/now?location={id}&key={key}`
    pub fn weather_url(&self, api_key: &str, location_id: &str) -> Result<Url, WeatherError> {
        let mut url = join_segments(
            Stage::WeatherNow,
            &self.endpoints.qweather_api,
            &["v7", "weather", "now"],
        )?;
        url.query_pairs_mut()
            .append_pair("location", location_id)
            .append_pair("key", api_key);
        Ok(url)
    }
}

/// QWeather reports errors as HTTP 200 with a non-"200" `code` in the body.
fn ensure_ok(stage: Stage, code: Option<&str>) -> Result<(), WeatherError> {
    match code {
        None | Some("200") => Ok(()),
        Some(code) => {
            tracing::warn!(%stage, code, "{}", stage.notice());
            Err(WeatherError::Rejected {
                stage,
                code: code.to_string(),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    code: Option<String>,
    #[serde(default)]
    location: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QwLocation {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NowResponse {
    code: Option<String>,
    now: Option<QwNow>,
}

#[derive(Debug, Deserialize)]
struct QwNow {
    temp: Value,
    text: String,
}

#[async_trait]
impl WeatherProvider for QWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::QWeather
    }

    fn description(&self) -> &'static str {
        "Query QWeather for current weather conditions."
    }

    fn input_schema(&self) -> Value {
        schemars::schema_for!(CnWeatherQuery).to_value()
    }

    async fn invoke(&self, args: Value) -> Result<Value, WeatherError> {
        let query: CnWeatherQuery =
            serde_json::from_value(args).map_err(WeatherError::InvalidArguments)?;
        let result = self.lookup(&query).await?;
        serde_json::to_value(result).map_err(WeatherError::Encode)
    }
}

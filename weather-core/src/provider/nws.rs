use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    WeatherError,
    config::Endpoints,
    error::Stage,
    model::{ForecastPeriod, GeocodeResult, UsWeatherQuery, UsWeatherResult},
    provider::{ProviderId, first_entry, get_json, join_segments, parse_url},
};

use super::WeatherProvider;

/// Current temperature for US cities: geocode.xyz for coordinates, then the
/// National Weather Service points and forecast endpoints.
#[derive(Debug, Clone)]
pub struct NwsProvider {
    api_key: Option<String>,
    endpoints: Endpoints,
    http: Client,
}

impl NwsProvider {
    pub fn new(api_key: Option<String>, endpoints: Endpoints, http: Client) -> Self {
        Self {
            api_key,
            endpoints,
            http,
        }
    }

    pub async fn lookup(&self, query: &UsWeatherQuery) -> Result<UsWeatherResult, WeatherError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderId::Nws.missing_key())?;

        let geo: GeocodeResult =
            get_json(&self.http, Stage::Geocode, self.geocode_url(api_key, query)?).await?;

        let points: PointsResponse = get_json(
            &self.http,
            Stage::PointsMetadata,
            self.points_url(&geo)?,
        )
        .await?;

        let forecast_url = parse_url(Stage::Forecast, &points.properties.forecast)?;
        let forecast: ForecastResponse = get_json(&self.http, Stage::Forecast, forecast_url).await?;

        let today: ForecastPeriod =
            first_entry(Stage::Forecast, forecast.properties.periods, "no forecast periods")?;

        tracing::info!(city = %query.city, state = %query.state, "forecast retrieved");

        Ok(UsWeatherResult {
            city: query.city.clone(),
            state: query.state.clone(),
            country: query.country.clone(),
            temperature: today.temperature,
        })
    }

    /// `{geocode}/{city},{state},{country}?json=1&auth={key}`, place lower-cased.
    pub fn geocode_url(&self, api_key: &str, query: &UsWeatherQuery) -> Result<Url, WeatherError> {
        let place = format!(
            "{},{},{}",
            query.city.to_lowercase(),
            query.state.to_lowercase(),
            query.country.to_lowercase(),
        );

        let mut url = join_segments(Stage::Geocode, &self.endpoints.geocode, &[&place])?;
        url.query_pairs_mut()
            .append_pair("json", "1")
            .append_pair("auth", api_key);
        Ok(url)
    }

    /// `{weather_gov}/points/{latt},{longt}`
    pub fn points_url(&self, geo: &GeocodeResult) -> Result<Url, WeatherError> {
        let coords = format!("{},{}", geo.latt, geo.longt);
        join_segments(
            Stage::PointsMetadata,
            &self.endpoints.weather_gov,
            &["points", &coords],
        )
    }
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<Value>,
}

#[async_trait]
impl WeatherProvider for NwsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Nws
    }

    fn description(&self) -> &'static str {
        "Get the current temperature for a city."
    }

    fn input_schema(&self) -> Value {
        schemars::schema_for!(UsWeatherQuery).to_value()
    }

    async fn invoke(&self, args: Value) -> Result<Value, WeatherError> {
        let query: UsWeatherQuery =
            serde_json::from_value(args).map_err(WeatherError::InvalidArguments)?;
        let result = self.lookup(&query).await?;
        serde_json::to_value(result).map_err(WeatherError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> NwsProvider {
        NwsProvider::new(None, Endpoints::default(), Client::new())
    }

    #[test]
    fn geocode_url_lowercases_place() {
        let query = UsWeatherQuery::new("Boston", "MA").with_country("USA");
        let url = provider().geocode_url("SECRET", &query).unwrap();

        assert_eq!(url.as_str(), "https://geocode.xyz/boston,ma,usa?json=1&auth=SECRET");
    }

    #[test]
    fn geocode_url_encodes_place() {
        let query = UsWeatherQuery::new("New York", "NY");
        let url = provider().geocode_url("k", &query).unwrap();
        assert_eq!(url.path(), "/new%20york,ny,usa");

        let query = UsWeatherQuery::new("a/b?c", "NY");
        let url = provider().geocode_url("k", &query).unwrap();
        assert_eq!(url.path(), "/a%2Fb%3Fc,ny,usa");
        assert_eq!(url.query(), Some("json=1&auth=k"));
    }

    #[test]
    fn geocode_url_keeps_base_path() {
        let endpoints = Endpoints {
            geocode: "http://localhost:8080/geo/".to_string(),
            ..Endpoints::default()
        };
        let provider = NwsProvider::new(None, endpoints, Client::new());
        let url = provider.geocode_url("k", &UsWeatherQuery::new("Boston", "MA")).unwrap();

        assert_eq!(url.as_str(), "http://localhost:8080/geo/boston,ma,usa?json=1&auth=k");
    }

    #[test]
    fn points_url_embeds_coordinates_verbatim() {
        let geo: GeocodeResult =
            serde_json::from_value(json!({"latt": 40.7, "longt": -74.0})).unwrap();
        let url = provider().points_url(&geo).unwrap();

        assert_eq!(url.as_str(), "https://api.weather.gov/points/40.7,-74.0");
    }

    #[tokio::test]
    async fn lookup_without_key_is_configuration_error() {
        let err = provider()
            .lookup(&UsWeatherQuery::new("Boston", "MA"))
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("GEOCODE_API_KEY"));
    }

    #[tokio::test]
    async fn invoke_rejects_bad_arguments() {
        let err = provider().invoke(json!({"city": "Boston"})).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidArguments(_)));
    }
}

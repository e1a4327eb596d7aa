use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use weather_core::{
    CnWeatherQuery, CnWeatherResult, Config, NwsProvider, ProviderId, QWeatherProvider,
    UsWeatherQuery, UsWeatherResult, all_providers, provider::http_client, provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookup tools")]
pub struct Cli {
    /// Print raw JSON instead of a one-line summary.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Today's temperature for a US city (geocode.xyz + api.weather.gov).
    Us {
        city: String,
        /// Two letter state abbreviation, e.g. "MA".
        state: String,
        #[arg(long, default_value = "usa")]
        country: String,
    },

    /// Current conditions for a Chinese city (QWeather).
    Cn {
        city: String,
        /// Parent administrative region used to disambiguate the city, e.g. "北京".
        #[arg(long)]
        adm: Option<String>,
    },

    /// List tool definitions as JSON.
    Tools,

    /// Invoke a tool by name with JSON arguments.
    Call {
        /// Tool name or provider id, e.g. "weather-data" or "qweather".
        tool: String,
        /// JSON object with the tool arguments.
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Store the API key for a provider in the config file.
    Configure {
        /// Provider short name, e.g. "nws" or "qweather".
        provider: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Us {
                city,
                state,
                country,
            } => {
                let config = Config::load()?;
                let provider = NwsProvider::new(
                    config.api_key(ProviderId::Nws).map(str::to_owned),
                    config.endpoints.clone(),
                    http_client(&config)?,
                );

                let query = UsWeatherQuery::new(city, state).with_country(country);
                let result = provider.lookup(&query).await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", summarize_us(&result));
                }
            }
            Command::Cn { city, adm } => {
                let config = Config::load()?;
                let provider = QWeatherProvider::new(
                    config.api_key(ProviderId::QWeather).map(str::to_owned),
                    config.endpoints.clone(),
                    http_client(&config)?,
                );

                let query = CnWeatherQuery { city, adm };
                let result = provider.lookup(&query).await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", summarize_cn(&result));
                }
            }
            Command::Tools => {
                let config = Config::load()?;
                let definitions: Vec<_> = all_providers(&config)?
                    .iter()
                    .map(|p| p.definition())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&definitions)?);
            }
            Command::Call { tool, args } => {
                let id = ProviderId::try_from(tool.as_str())?;
                let args: Value =
                    serde_json::from_str(&args).context("Tool arguments must be valid JSON")?;

                let config = Config::load()?;
                let output = provider_from_config(id, &config)?.invoke(args).await?;
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(id)?;
            }
        }

        Ok(())
    }
}

/// Prompt for an API key and persist it. Environment overrides are not written back.
fn configure(id: ProviderId) -> anyhow::Result<()> {
    let mut config = Config::load_file()?;

    if config.is_configured(id) {
        let replace = inquire::Confirm::new(&format!("An API key for '{id}' is stored. Replace it?"))
            .with_default(false)
            .prompt()?;
        if !replace {
            return Ok(());
        }
    }

    let api_key = inquire::Password::new(&format!("API key for '{id}' ({}):", id.api_key_env()))
        .without_confirmation()
        .prompt()?;
    let api_key = api_key.trim();
    anyhow::ensure!(!api_key.is_empty(), "API key must not be empty");

    config.upsert_api_key(id, api_key.to_string());
    config.save()?;

    println!("Saved API key for '{id}' to {}", Config::config_file_path()?.display());
    Ok(())
}

fn summarize_us(result: &UsWeatherResult) -> String {
    format!(
        "{}, {} ({}): {}",
        result.city,
        result.state,
        result.country,
        plain(&result.temperature)
    )
}

fn summarize_cn(result: &CnWeatherResult) -> String {
    format!("{}: {}, {}", result.city, plain(&result.temperature), result.weather)
}

/// Strings without their JSON quotes, everything else as JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_us_with_default_country() {
        let cli = Cli::try_parse_from(["weather", "us", "Boston", "MA"]).unwrap();
        match cli.command {
            Command::Us {
                city,
                state,
                country,
            } => {
                assert_eq!(city, "Boston");
                assert_eq!(state, "MA");
                assert_eq!(country, "usa");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.json);
    }

    #[test]
    fn parses_cn_with_adm_and_json_flag() {
        let cli = Cli::try_parse_from(["weather", "cn", "朝阳", "--adm", "北京", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Cn { city, adm } => {
                assert_eq!(city, "朝阳");
                assert_eq!(adm.as_deref(), Some("北京"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn call_defaults_to_empty_arguments() {
        let cli = Cli::try_parse_from(["weather", "call", "qweather-data"]).unwrap();
        match cli.command {
            Command::Call { tool, args } => {
                assert_eq!(tool, "qweather-data");
                assert_eq!(args, "{}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn us_requires_state() {
        assert!(Cli::try_parse_from(["weather", "us", "Boston"]).is_err());
    }

    #[test]
    fn summaries_strip_json_quotes() {
        let us = UsWeatherResult {
            city: "Boston".into(),
            state: "MA".into(),
            country: "usa".into(),
            temperature: json!(55),
        };
        assert_eq!(summarize_us(&us), "Boston, MA (usa): 55");

        let cn = CnWeatherResult {
            city: "朝阳".into(),
            temperature: json!("18"),
            weather: "晴".into(),
        };
        assert_eq!(summarize_cn(&cn), "朝阳: 18, 晴");
    }
}

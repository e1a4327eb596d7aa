use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::provider::ProviderId;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Stored credential for a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub api_key: String,
}

/// Base URLs of the upstream services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocode: String,
    pub weather_gov: String,
    pub qweather_geo: String,
    pub qweather_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode: "https://geocode.xyz".to_string(),
            weather_gov: "https://api.weather.gov".to_string(),
            qweather_geo: "https://geoapi.qweather.com".to_string(),
            qweather_api: "https://devapi.qweather.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at one base URL, e.g. a local mock server.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            geocode: base.clone(),
            weather_gov: base.clone(),
            qweather_geo: base.clone(),
            qweather_api: base,
        }
    }
}

/// Top-level configuration, resolved once at startup and handed to each provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [credentials.qweather]
    /// api_key = "..."
    #[serde(default)]
    pub credentials: HashMap<String, Credential>,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Per-request timeout; 10 seconds when unset or 0.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load the config file (if any) and overlay API keys from the environment.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.overlay_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Replace stored keys with non-empty values of each provider's env var.
    pub fn overlay_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for id in ProviderId::all() {
            if let Some(key) = lookup(id.api_key_env()).filter(|k| !k.trim().is_empty()) {
                self.upsert_api_key(*id, key);
            }
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-tools", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn upsert_api_key(&mut self, id: ProviderId, api_key: String) {
        self.credentials.insert(id.as_str().to_string(), Credential { api_key });
    }

    /// Returns the API key for a provider, if a non-empty one is present.
    pub fn api_key(&self, id: ProviderId) -> Option<&str> {
        self.credentials
            .get(id.as_str())
            .map(|c| c.api_key.as_str())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.api_key(id).is_some()
    }

    pub fn timeout(&self) -> Duration {
        let secs = self
            .timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn default_config_has_no_keys() {
        let cfg = Config::default();

        assert!(!cfg.is_configured(ProviderId::Nws));
        assert!(!cfg.is_configured(ProviderId::QWeather));
        assert_eq!(cfg.endpoints.weather_gov, "https://api.weather.gov");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn env_overlay_sets_keys() {
        let mut cfg = Config::default();
        cfg.overlay_env(env(&[("GEOCODE_API_KEY", "GEO"), ("QWEATHER_API_KEY", "QW")]));

        assert_eq!(cfg.api_key(ProviderId::Nws), Some("GEO"));
        assert_eq!(cfg.api_key(ProviderId::QWeather), Some("QW"));
    }

    #[test]
    fn env_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(ProviderId::Nws, "FROM_FILE".into());
        cfg.overlay_env(env(&[("GEOCODE_API_KEY", "FROM_ENV")]));

        assert_eq!(cfg.api_key(ProviderId::Nws), Some("FROM_ENV"));
    }

    #[test]
    fn empty_env_value_is_ignored() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(ProviderId::QWeather, "FROM_FILE".into());
        cfg.overlay_env(env(&[("QWEATHER_API_KEY", "")]));

        assert_eq!(cfg.api_key(ProviderId::QWeather), Some("FROM_FILE"));
    }

    #[test]
    fn empty_stored_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_api_key(ProviderId::Nws, "  ".into());

        assert!(!cfg.is_configured(ProviderId::Nws));
    }

    #[test]
    fn parses_partial_toml() {
        let cfg = Config::from_toml(
            r#"
            timeout_secs = 3

            [credentials.qweather]
            api_key = "QW"

            [endpoints]
            qweather_api = "https://api.qweather.com"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.api_key(ProviderId::QWeather), Some("QW"));
        assert_eq!(cfg.endpoints.qweather_api, "https://api.qweather.com");
        assert_eq!(cfg.endpoints.geocode, "https://geocode.xyz");
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let cfg = Config::from_toml("timeout_secs = 0").expect("valid config");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn endpoints_all_at_strips_trailing_slash() {
        let e = Endpoints::all_at("http://127.0.0.1:9000/");
        assert_eq!(e.geocode, "http://127.0.0.1:9000");
        assert_eq!(e.qweather_api, "http://127.0.0.1:9000");
    }
}

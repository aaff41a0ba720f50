//! Configuration file handling with TOML support.

use crate::models::{Holding, NewHolding};
use crate::notify::DEFAULT_DURATION_MS;
use crate::scheduler::{ALERT_INTERVAL, FETCH_TIMEOUT, TICKER_INTERVAL};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Polling cadence
    #[serde(default)]
    pub polling: PollingConfig,

    /// Notification delivery
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Holdings used until a portfolio has been saved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed: Vec<SeedHolding>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Where alerts, portfolio and watchlist are stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            data_dir: None,
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// Polling intervals, written as humantime strings ("60s", "2m").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_alert_interval", with = "duration_str")]
    pub alert_interval: Duration,

    #[serde(default = "default_ticker_interval", with = "duration_str")]
    pub ticker_interval: Duration,

    #[serde(default = "default_fetch_timeout", with = "duration_str")]
    pub fetch_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            alert_interval: default_alert_interval(),
            ticker_interval: default_ticker_interval(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

fn default_alert_interval() -> Duration {
    ALERT_INTERVAL
}
fn default_ticker_interval() -> Duration {
    TICKER_INTERVAL
}
fn default_fetch_timeout() -> Duration {
    FETCH_TIMEOUT
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long a notification stays visible
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// Ring the terminal bell on every alert
    #[serde(default)]
    pub bell: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            bell: false,
        }
    }
}

fn default_duration_ms() -> u64 {
    DEFAULT_DURATION_MS
}

/// Single seed holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedHolding {
    pub symbol: String,
    pub shares: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let duration = humantime::parse_duration(&raw).map_err(serde::de::Error::custom)?;
        if duration.is_zero() {
            return Err(serde::de::Error::custom("interval must be greater than zero"));
        }
        Ok(duration)
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(error = %format!("{:#}", e), "failed to load config, using defaults");
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tickerwatch").join("config.toml"))
    }

    /// Seed holdings, validated. Duplicate symbols are merged like any add.
    pub fn seed_holdings(&self) -> Result<Vec<Holding>> {
        let mut holdings: Vec<Holding> = Vec::new();
        for seed in &self.seed {
            let lot = NewHolding::new(&seed.symbol, seed.shares, seed.purchase_price, seed.purchase_date)
                .with_context(|| format!("Invalid seed holding: {}", seed.symbol))?;
            match holdings.iter().position(|h| h.symbol == lot.symbol()) {
                Some(index) => holdings[index].merge(&lot),
                None => holdings.push(lot.into()),
            }
        }
        Ok(holdings)
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# tickerwatch configuration file

[general]
# HTTP timeout in seconds
timeout = 10
# Where alerts, portfolio and watchlist are stored (defaults to the user data dir)
# data_dir = "/home/me/.local/share/tickerwatch"

[polling]
# How often active alerts are checked
alert_interval = "60s"
# How often the live ticker refreshes
ticker_interval = "30s"
# Upper bound on a single quote request
fetch_timeout = "10s"

[notifications]
# How long a notification stays visible, in milliseconds
duration_ms = 5000
# Ring the terminal bell when an alert fires
bell = false

# Demo portfolio used until you add your own holdings
[[seed]]
symbol = "AAPL"
shares = 10
purchase_price = 150.00
purchase_date = "2024-01-15"

[[seed]]
symbol = "MSFT"
shares = 5
purchase_price = 380.00
purchase_date = "2024-02-01"
"##
}

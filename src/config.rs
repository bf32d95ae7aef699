//! Monitor Configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Static configuration for the session monitor
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MonitorConfig {
    /// Notification webhook; sends are logged and dropped when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Status code the sink returns on delivery (Discord answers 204)
    #[serde(default = "default_success_status")]
    pub success_status: u16,
    /// Daily profit target in fiat (USD)
    #[serde(default = "default_daily_target_usd")]
    pub daily_target_usd: Decimal,
    /// Base asset to fiat conversion rate (USD per SOL)
    #[serde(default = "default_sol_usd_rate")]
    pub sol_usd_rate: Decimal,
    /// Minimum spacing between dashboard updates
    #[serde(default = "default_dashboard_interval_secs")]
    pub dashboard_interval_secs: u64,
    /// Send a one-time notice on the first tick
    #[serde(default = "default_startup_notice")]
    pub startup_notice: bool,
    /// Consecutive close failures before a position escalates
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,
    /// Copies of each critical alert sent per escalation
    #[serde(default = "default_escalation_burst")]
    pub escalation_burst: u32,
    /// Role mentioned on critical alerts and large trades
    #[serde(default)]
    pub role_id: Option<String>,
    /// Trades with |P&L| above this (SOL) mention the role
    #[serde(default = "default_big_trade_sol")]
    pub big_trade_sol: Decimal,
    /// Footer attached to every event
    #[serde(default = "default_footer")]
    pub footer: String,
    /// Largest chart image the sink accepts
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// How far back the P&L trend reaches
    #[serde(default = "default_trend_window_hours")]
    pub trend_window_hours: i64,
    /// Host scheduler tick
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Session state document written by the trading process
    #[serde(default)]
    pub state_path: Option<PathBuf>,
    /// Price feed base URL (`GET {url}/prices/{token}`)
    #[serde(default)]
    pub price_feed_url: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            success_status: default_success_status(),
            daily_target_usd: default_daily_target_usd(),
            sol_usd_rate: default_sol_usd_rate(),
            dashboard_interval_secs: default_dashboard_interval_secs(),
            startup_notice: default_startup_notice(),
            escalation_threshold: default_escalation_threshold(),
            escalation_burst: default_escalation_burst(),
            role_id: None,
            big_trade_sol: default_big_trade_sol(),
            footer: default_footer(),
            max_image_bytes: default_max_image_bytes(),
            trend_window_hours: default_trend_window_hours(),
            tick_secs: default_tick_secs(),
            state_path: None,
            price_feed_url: None,
        }
    }
}

impl MonitorConfig {
    /// Load from an optional file, overridden by `MONITOR_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MONITOR").try_parsing(true),
        );

        let config: MonitorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sol_usd_rate <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "sol_usd_rate must be positive, got {}",
                self.sol_usd_rate
            )));
        }
        if self.dashboard_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "dashboard_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.escalation_threshold == 0 {
            return Err(ConfigError::Invalid(
                "escalation_threshold must be at least 1".to_string(),
            ));
        }
        if self.escalation_burst == 0 {
            return Err(ConfigError::Invalid(
                "escalation_burst must be at least 1".to_string(),
            ));
        }
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid("tick_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn dashboard_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dashboard_interval_secs as i64)
    }

    pub fn trend_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.trend_window_hours)
    }

    /// Default state document location (`~/.session-monitor/now.json`)
    pub fn resolved_state_path(&self) -> Option<PathBuf> {
        self.state_path.clone().or_else(|| {
            dirs::home_dir().map(|home| home.join(".session-monitor").join("now.json"))
        })
    }
}

fn default_request_timeout_secs() -> u64 { 10 }
fn default_success_status() -> u16 { 204 }
fn default_daily_target_usd() -> Decimal { Decimal::from(50) }
fn default_sol_usd_rate() -> Decimal { Decimal::from(240) }
fn default_dashboard_interval_secs() -> u64 { 300 }
fn default_startup_notice() -> bool { true }
fn default_escalation_threshold() -> u32 { 1 }
fn default_escalation_burst() -> u32 { 3 }
fn default_big_trade_sol() -> Decimal { Decimal::new(5, 1) }
fn default_footer() -> String { "Solana Trading Bot".to_string() }
fn default_max_image_bytes() -> usize { 8 * 1024 * 1024 }
fn default_trend_window_hours() -> i64 { 24 }
fn default_tick_secs() -> u64 { 60 }

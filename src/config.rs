// =============================================================================
// Application Configuration
// =============================================================================
//
// Every tunable lives here. All fields carry `#[serde(default = ...)]` so an
// empty or partial JSON file is valid, and a missing file simply means
// "defaults". A handful of environment variables override the file so the
// server can be pointed elsewhere without editing it.
//
//   STOCKSCOPE_CONFIG     path of the JSON file (default: stockscope.json)
//   STOCKSCOPE_BIND_ADDR  HTTP listen address
//   STOCKSCOPE_YAHOO_URL  chart API base url
//
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chart::ChartLayout;
use crate::indicators::{DEFAULT_MA_WINDOW, DEFAULT_RSI_WINDOW};
use crate::market_data::yahoo::DEFAULT_BASE_URL;
use crate::types::DateRange;

pub const DEFAULT_CONFIG_PATH: &str = "stockscope.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_ma_window() -> usize {
    DEFAULT_MA_WINDOW
}

fn default_rsi_window() -> usize {
    DEFAULT_RSI_WINDOW
}

fn default_chart_width() -> u32 {
    ChartLayout::default().width
}

fn default_chart_height() -> u32 {
    ChartLayout::default().height
}

fn default_yahoo_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// First day of every fetched history. The last day is always "today".
    #[serde(default = "default_history_start")]
    pub history_start: NaiveDate,

    /// Moving-average window in bars.
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,

    /// RSI window in bars.
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    /// Upstream request timeout. Unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            history_start: default_history_start(),
            ma_window: default_ma_window(),
            rsi_window: default_rsi_window(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            yahoo_base_url: default_yahoo_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults. An unreadable or invalid
    /// file is logged and replaced by defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Resolve the config path from the environment, load it and apply env
    /// overrides.
    pub fn from_env() -> Self {
        let mut config = Self::load_or_default(config_path());
        config.apply_env();
        config
    }

    /// Apply `STOCKSCOPE_*` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("STOCKSCOPE_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("STOCKSCOPE_YAHOO_URL") {
            if !url.trim().is_empty() {
                self.yahoo_base_url = url.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ma_window == 0 {
            bail!("ma_window must be at least 1");
        }
        if self.rsi_window == 0 {
            bail!("rsi_window must be at least 1");
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            bail!(
                "chart size must be non-zero, got {}x{}",
                self.chart_width,
                self.chart_height
            );
        }
        if self.bind_addr.trim().is_empty() {
            bail!("bind_addr must not be empty");
        }
        Ok(())
    }

    /// `[history_start, today]`. A start in the future is clamped to today.
    pub fn history_range(&self, today: NaiveDate) -> Result<DateRange> {
        DateRange::new(self.history_start.min(today), today)
    }

    pub fn layout(&self) -> ChartLayout {
        ChartLayout {
            width: self.chart_width,
            height: self.chart_height,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// `STOCKSCOPE_CONFIG` or the default file name.
pub fn config_path() -> PathBuf {
    std::env::var("STOCKSCOPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// =============================================================================
// Tests
// =============================================================================

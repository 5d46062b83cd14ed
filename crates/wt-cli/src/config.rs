//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wt_clockify::{ClientSettings, DEFAULT_BASE_URL};
use wt_core::{DailyWindow, ExclusionRuleSet};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Clockify API key.
    pub api_key: Option<String>,
    /// Clockify workspace the entries live in.
    pub workspace_id: Option<String>,
    /// Clockify user whose entries are adjusted.
    pub user_id: Option<String>,
    /// Clockify API root.
    pub base_url: String,
    /// Zone in which all wall-clock rules are evaluated.
    pub timezone: Tz,
    /// How many days back `wt reconcile` looks by default.
    pub lookback_days: u32,
    /// Exclusion windows.
    pub rules: RulesConfig,
}

/// Exclusion windows as written in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Days whose entries are deleted outright. Empty disables the rule.
    pub weekend_days: Vec<Weekday>,
    pub night: WindowConfig,
    pub lunch: WindowConfig,
}

/// One daily window, times as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub enabled: bool,
    pub start: String,
    pub end: String,
}

impl WindowConfig {
    fn new(start: &str, end: &str) -> Self {
        Self {
            enabled: true,
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn to_window(&self, rule: &'static str) -> Result<Option<DailyWindow>> {
        if !self.enabled {
            return Ok(None);
        }
        let start = parse_clock(&self.start).with_context(|| format!("invalid {rule} start"))?;
        let end = parse_clock(&self.end).with_context(|| format!("invalid {rule} end"))?;
        Ok(Some(DailyWindow::new(rule, start, end)?))
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            night: WindowConfig::new("20:00", "09:00"),
            lunch: WindowConfig::new("12:00", "12:30"),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("workspace_id", &self.workspace_id)
            .field("user_id", &self.user_id)
            .field("base_url", &self.base_url)
            .field("timezone", &self.timezone)
            .field("lookback_days", &self.lookback_days)
            .field("rules", &self.rules)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            workspace_id: None,
            user_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timezone: chrono_tz::Europe::Paris,
            lookback_days: 14,
            rules: RulesConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*, nested keys as WT_RULES__LUNCH__START)
        figment = figment.merge(Env::prefixed("WT_").split("__"));

        figment.extract()
    }

    /// Builds the full rule set from the configured windows.
    pub fn rules(&self) -> Result<ExclusionRuleSet> {
        let night = self.rules.night.to_window("night")?;
        let lunch = self.rules.lunch.to_window("lunch")?;
        ExclusionRuleSet::new(
            self.timezone,
            self.rules.weekend_days.iter().copied(),
            night,
            lunch,
        )
        .context("invalid exclusion rules")
    }

    /// Builds the lunch-only rule set used by `wt split-lunch`.
    pub fn lunch_rules(&self) -> Result<ExclusionRuleSet> {
        let lunch = self.rules.lunch.to_window("lunch")?;
        ExclusionRuleSet::new(self.timezone, [], None, lunch).context("invalid lunch rule")
    }

    /// Clockify settings, failing if credentials or scope are missing.
    pub fn client_settings(&self) -> Result<ClientSettings> {
        Ok(ClientSettings {
            api_key: required(self.api_key.as_deref(), "Clockify API key", "WT_API_KEY")?,
            workspace_id: required(
                self.workspace_id.as_deref(),
                "Clockify workspace ID",
                "WT_WORKSPACE_ID",
            )?,
            user_id: required(self.user_id.as_deref(), "Clockify user ID", "WT_USER_ID")?,
            base_url: self.base_url.clone(),
        })
    }
}

fn required(value: Option<&str>, what: &str, env: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("missing {what} (set {env} or config.toml)"))
}

fn parse_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("expected HH:MM, got {value:?}"))
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

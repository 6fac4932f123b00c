//! Runtime settings for `LedgerBuddy`.
//!
//! Settings are read from a TOML file (`config.toml` by default, or the path in
//! `LEDGER_BUDDY_CONFIG`). Every field has a default, so a missing file is not an
//! error. Deployment values and secrets are then overridden from the environment.

use crate::errors::{Error, Result};
use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "LEDGER_BUDDY_CONFIG";

/// Application settings consumed by the core and the HTTP surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database connection string
    pub database_url: String,
    /// Address the webhook server listens on
    pub bind_address: String,
    /// The single currency code the ledger accepts
    pub base_currency: String,
    /// Operating timezone for dates and report ranges
    pub timezone: Tz,
    /// Minutes an issued code stays valid
    pub otp_ttl_minutes: i64,
    /// Maximum codes issued per user inside the rate-limit window
    pub otp_rate_limit_count: u64,
    /// Length of the trailing rate-limit window in minutes
    pub otp_rate_limit_window_minutes: i64,
    /// Whether unrecognised messages are sent to the AI extractor
    pub ai_fallback_enabled: bool,
    /// API key for the Gemini fallback
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Window in which an identical message without transport id counts as a redelivery
    pub duplicate_window_seconds: i64,
    /// Web dashboard link appended to code replies
    pub dashboard_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: super::database::DEFAULT_DATABASE_URL.to_string(),
            bind_address: "0.0.0.0:8000".to_string(),
            base_currency: "PEN".to_string(),
            timezone: chrono_tz::America::Lima,
            otp_ttl_minutes: 5,
            otp_rate_limit_count: 3,
            otp_rate_limit_window_minutes: 60,
            ai_fallback_enabled: false,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            duplicate_window_seconds: 10,
            dashboard_url: None,
        }
    }
}

impl Settings {
    /// Code time-to-live as a duration
    #[must_use]
    pub fn otp_ttl(&self) -> Duration {
        Duration::minutes(self.otp_ttl_minutes)
    }

    /// Rate-limit window as a duration
    #[must_use]
    pub fn otp_rate_limit_window(&self) -> Duration {
        Duration::minutes(self.otp_rate_limit_window_minutes)
    }

    /// Redelivery window as a duration
    #[must_use]
    pub fn duplicate_window(&self) -> Duration {
        Duration::seconds(self.duplicate_window_seconds)
    }

    /// Checks values that deserialisation alone cannot.
    pub fn validate(&self) -> Result<()> {
        if self.base_currency.trim().is_empty() {
            return Err(Error::Config {
                message: "base_currency cannot be empty".to_string(),
            });
        }
        if self.otp_ttl_minutes <= 0 || self.otp_rate_limit_window_minutes <= 0 {
            return Err(Error::Config {
                message: "OTP durations must be positive".to_string(),
            });
        }
        if self.otp_rate_limit_count == 0 {
            return Err(Error::Config {
                message: "otp_rate_limit_count must be at least 1".to_string(),
            });
        }
        if self.ai_fallback_enabled && self.gemini_api_key.is_none() {
            return Err(Error::Config {
                message: "ai_fallback_enabled requires GEMINI_API_KEY".to_string(),
            });
        }
        Ok(())
    }

    /// Applies environment overrides on top of file values.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.gemini_model = model;
        }
        if let Ok(flag) = std::env::var("AI_FALLBACK_ENABLED") {
            self.ai_fallback_enabled = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Ok(tz) = std::env::var("TIMEZONE") {
            self.timezone = tz.trim().parse().map_err(|e| Error::Config {
                message: format!("Invalid TIMEZONE '{tz}': {e}"),
            })?;
        }
        Ok(())
    }
}

/// Parses settings from a TOML string.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        tracing::debug!("No config file at {:?}, using defaults", path_ref);
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_settings(&contents)
}

/// Loads settings from the configured file, applies environment overrides and validates.
pub fn load_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let mut settings = load_settings_from(&path)?;
    settings.apply_env()?;
    settings.validate()?;
    tracing::info!(
        timezone = %settings.timezone,
        base_currency = %settings.base_currency,
        ai_fallback = settings.ai_fallback_enabled,
        "Settings loaded"
    );
    Ok(settings)
}

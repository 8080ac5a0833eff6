//! Session configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `DELIVECROUS_DATA_DIR` - Directory for persisted state (default: in-memory storage)
//! - `DELIVECROUS_DEFAULT_BALANCE` - Balance given to a new user (default: 50.00)
//! - `DELIVECROUS_ORDER_COUNTDOWN_SECS` - Delivery countdown for new orders (default: 180)
//! - `DELIVECROUS_TIMER_SECS` - Order ETA timer duration (default: 600)
//! - `DELIVECROUS_TICK_MS` - Countdown tick interval (default: 1000, must be > 0)
//! - `DELIVECROUS_IDENTITY_POLL_MS` - Re-read the stored user this often (default: disabled)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use delivecrous_core::{DEFAULT_ORDER_COUNTDOWN_SECS, Money};
use thiserror::Error;

use crate::timer::DEFAULT_TIMER_SECS;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Where persisted state lives; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Balance assigned to a user with no stored balance
    pub default_balance: Money,
    /// Delivery countdown for a newly placed order
    pub order_countdown_secs: u32,
    /// Duration of the single-order ETA timer
    pub timer_secs: u32,
    /// Interval between countdown ticks
    pub tick_interval: Duration,
    /// Interval for re-reading the stored user record, if enabled
    pub identity_poll_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_balance: Money::from_euros(50),
            order_countdown_secs: DEFAULT_ORDER_COUNTDOWN_SECS,
            timer_secs: DEFAULT_TIMER_SECS,
            tick_interval: Duration::from_secs(1),
            identity_poll_interval: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("DELIVECROUS_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let default_balance: Money = parse_or(
            &lookup,
            "DELIVECROUS_DEFAULT_BALANCE",
            defaults.default_balance,
        )?;
        if default_balance.is_negative() {
            return Err(invalid("DELIVECROUS_DEFAULT_BALANCE", "must not be negative"));
        }

        let order_countdown_secs = parse_or(
            &lookup,
            "DELIVECROUS_ORDER_COUNTDOWN_SECS",
            defaults.order_countdown_secs,
        )?;
        let timer_secs = parse_or(&lookup, "DELIVECROUS_TIMER_SECS", defaults.timer_secs)?;

        let tick_ms: u64 = parse_or(&lookup, "DELIVECROUS_TICK_MS", 1000)?;
        if tick_ms == 0 {
            return Err(invalid("DELIVECROUS_TICK_MS", "must be greater than 0"));
        }

        let poll_ms: u64 = parse_or(&lookup, "DELIVECROUS_IDENTITY_POLL_MS", 0)?;
        let identity_poll_interval = (poll_ms > 0).then(|| Duration::from_millis(poll_ms));

        Ok(Self {
            data_dir,
            default_balance,
            order_countdown_secs,
            timer_secs,
            tick_interval: Duration::from_millis(tick_ms),
            identity_poll_interval,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.into())
}

/// Parse a variable, falling back to `default` when unset or blank.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| invalid(key, e.to_string()))
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SessionConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SessionConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.default_balance, Money::from_euros(50));
        assert_eq!(config.order_countdown_secs, 180);
        assert_eq!(config.timer_secs, 600);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.identity_poll_interval.is_none());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DELIVECROUS_DATA_DIR", "/tmp/delivecrous"),
            ("DELIVECROUS_DEFAULT_BALANCE", "12.50"),
            ("DELIVECROUS_ORDER_COUNTDOWN_SECS", "30"),
            ("DELIVECROUS_TIMER_SECS", "60"),
            ("DELIVECROUS_TICK_MS", "250"),
            ("DELIVECROUS_IDENTITY_POLL_MS", "2000"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/delivecrous")));
        assert_eq!(config.default_balance, Money::from_cents(1250));
        assert_eq!(config.order_countdown_secs, 30);
        assert_eq!(config.timer_secs, 60);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.identity_poll_interval, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_poll_interval_disables_polling() {
        let config = load(&[("DELIVECROUS_IDENTITY_POLL_MS", "0")]).unwrap();
        assert!(config.identity_poll_interval.is_none());
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        let err = load(&[("DELIVECROUS_TICK_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref name, _) if name == "DELIVECROUS_TICK_MS"));
    }

    #[test]
    fn test_negative_balance_is_rejected() {
        let err = load(&[("DELIVECROUS_DEFAULT_BALANCE", "-5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(load(&[("DELIVECROUS_TIMER_SECS", "ten")]).is_err());
        assert!(load(&[("DELIVECROUS_DEFAULT_BALANCE", "lots")]).is_err());
    }
}

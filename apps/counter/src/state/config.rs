//! # Counter Configuration
//!
//! Loaded once at startup from environment variables.
//!
//! | Variable                       | Default                    |
//! |--------------------------------|----------------------------|
//! | `APOTHECA_DB_PATH`             | platform data directory    |
//! | `APOTHECA_HOME_BRANCH`         | 1                          |
//! | `APOTHECA_MAX_CONNECTIONS`     | 5                          |
//! | `APOTHECA_STORE_NAME`          | Apotheca Pharmacy          |
//! | `APOTHECA_CURRENCY`            | VND                        |
//! | `APOTHECA_LOW_STOCK_THRESHOLD` | 10                         |
//!
//! Configuration is read-only after startup, so no mutex needed.

use std::path::PathBuf;
use std::str::FromStr;

use apotheca_core::{BranchId, Money, DEFAULT_HOME_BRANCH_ID, DEFAULT_LOW_STOCK_THRESHOLD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Counter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Database file; `None` uses the platform data directory
    pub db_path: Option<PathBuf>,

    /// Branch used for the advisory stock check on add-to-cart, and for
    /// checkout and stock commands that name no branch
    pub home_branch: BranchId,

    pub max_connections: u32,

    /// Store name (logged at startup)
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency: String,

    pub low_stock_threshold: i64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        CounterConfig {
            db_path: None,
            home_branch: DEFAULT_HOME_BRANCH_ID,
            max_connections: 5,
            store_name: "Apotheca Pharmacy".to_string(),
            currency: "VND".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl CounterConfig {
    /// Reads `APOTHECA_*` environment variables over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = CounterConfig::default();

        if let Some(path) = lookup("APOTHECA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(branch) = parse_var(&lookup, "APOTHECA_HOME_BRANCH")? {
            if branch <= 0 {
                return Err(invalid("APOTHECA_HOME_BRANCH", branch, "must be positive"));
            }
            config.home_branch = branch;
        }

        if let Some(max) = parse_var::<u32>(&lookup, "APOTHECA_MAX_CONNECTIONS")? {
            if max == 0 {
                return Err(invalid("APOTHECA_MAX_CONNECTIONS", max, "must be at least 1"));
            }
            config.max_connections = max;
        }

        if let Some(name) = lookup("APOTHECA_STORE_NAME") {
            config.store_name = name;
        }

        if let Some(currency) = lookup("APOTHECA_CURRENCY") {
            let currency = currency.trim().to_ascii_uppercase();
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(invalid("APOTHECA_CURRENCY", currency, "expected a 3-letter code"));
            }
            config.currency = currency;
        }

        if let Some(threshold) = parse_var(&lookup, "APOTHECA_LOW_STOCK_THRESHOLD")? {
            if threshold < 0 {
                return Err(invalid("APOTHECA_LOW_STOCK_THRESHOLD", threshold, "must not be negative"));
            }
            config.low_stock_threshold = threshold;
        }

        Ok(config)
    }

    /// Minor-unit exponent of the configured currency.
    pub fn currency_exponent(&self) -> u32 {
        match self.currency.as_str() {
            "VND" | "JPY" | "KRW" | "CLP" | "ISK" => 0,
            "BHD" | "KWD" | "OMR" | "TND" => 3,
            _ => 2,
        }
    }

    /// Formats an amount for display.
    ///
    /// ```rust
    /// use apotheca_core::Money;
    /// use apotheca_counter::state::CounterConfig;
    ///
    /// let config = CounterConfig::default();
    /// assert_eq!(config.format_currency(Money::from_minor(125000)), "125000 VND");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let exponent = self.currency_exponent();
        let sign = if amount.is_negative() { "-" } else { "" };
        let whole = amount.major_part(exponent).abs();

        if exponent == 0 {
            format!("{}{} {}", sign, whole, self.currency)
        } else {
            format!(
                "{}{}.{:0width$} {}",
                sign,
                whole,
                amount.minor_part(exponent),
                self.currency,
                width = exponent as usize
            )
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(var, &raw, e)),
    }
}

fn invalid(
    var: &'static str,
    value: impl std::fmt::Display,
    reason: impl std::fmt::Display,
) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<CounterConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CounterConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.home_branch, 1);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.currency, "VND");
        assert_eq!(config.low_stock_threshold, 10);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("APOTHECA_DB_PATH", "/tmp/apotheca.db"),
            ("APOTHECA_HOME_BRANCH", "3"),
            ("APOTHECA_CURRENCY", "usd"),
            ("APOTHECA_LOW_STOCK_THRESHOLD", " 25 "),
        ])
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/apotheca.db")));
        assert_eq!(config.home_branch, 3);
        assert_eq!(config.currency, "USD");
        assert_eq!(config.low_stock_threshold, 25);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(config_from(&[("APOTHECA_HOME_BRANCH", "main")]).is_err());
        assert!(config_from(&[("APOTHECA_HOME_BRANCH", "0")]).is_err());
        assert!(config_from(&[("APOTHECA_MAX_CONNECTIONS", "0")]).is_err());
        assert!(config_from(&[("APOTHECA_CURRENCY", "dollars")]).is_err());
        assert!(config_from(&[("APOTHECA_LOW_STOCK_THRESHOLD", "-1")]).is_err());
    }

    #[test]
    fn test_format_currency() {
        let vnd = CounterConfig::default();
        assert_eq!(vnd.format_currency(Money::from_minor(25000)), "25000 VND");

        let usd = CounterConfig {
            currency: "USD".into(),
            ..CounterConfig::default()
        };
        assert_eq!(usd.format_currency(Money::from_minor(1234)), "12.34 USD");
        assert_eq!(usd.format_currency(Money::from_minor(5)), "0.05 USD");
        assert_eq!(usd.format_currency(Money::from_minor(-1234)), "-12.34 USD");
    }
}

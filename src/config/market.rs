//! Market settings loading from market.toml
//!
//! Holds the knobs of the advertisement lifecycle: how long listings run, what
//! featuring costs and who receives the fee. Settings are read once at startup and
//! passed explicitly into every operation that needs them.

use crate::core::money;
use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Settings for the marketplace core and its HTTP surface
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// Days a new listing stays visible
    pub listing_days: i64,
    /// Days a featured listing stays visible, counted from the day it was featured
    pub featured_days: i64,
    /// Fixed fee for featuring a listing
    pub featured_fee: Decimal,
    /// User receiving feature fees
    pub system_payee_id: i64,
    /// Reject purchases of listings whose expiration date has passed
    pub purchase_requires_active: bool,
    /// Address the HTTP server listens on
    pub bind_address: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            listing_days: 30,
            featured_days: 30,
            featured_fee: Decimal::new(3000, 2),
            system_payee_id: 1,
            purchase_requires_active: false,
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

impl MarketSettings {
    /// Checks that windows are positive and the fee is a valid amount.
    pub fn validate(&self) -> Result<()> {
        if self.listing_days <= 0 {
            return Err(Error::Config {
                message: format!("listing_days must be positive, got {}", self.listing_days),
            });
        }
        if self.featured_days <= 0 {
            return Err(Error::Config {
                message: format!("featured_days must be positive, got {}", self.featured_days),
            });
        }
        money::to_cents(self.featured_fee).map_err(|e| Error::Config {
            message: format!("featured_fee is invalid: {e}"),
        })?;
        Ok(())
    }

    /// Feature fee in cents.
    pub fn featured_fee_cents(&self) -> Result<i64> {
        money::to_cents(self.featured_fee)
    }
}

/// Parses and validates settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<MarketSettings> {
    let settings: MarketSettings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse market settings: {e}"),
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file. A missing file yields the defaults.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<MarketSettings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No market settings at {:?}, using defaults", path_ref);
        return Ok(MarketSettings::default());
    }

    debug!("Loading market settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read market settings {path_ref:?}: {e}"),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `MARKET_CONFIG` (default `market.toml`) and applies the
/// `BIND_ADDRESS` override.
pub fn load_from_env() -> Result<MarketSettings> {
    let path = std::env::var("MARKET_CONFIG").unwrap_or_else(|_| "market.toml".to_string());
    let mut settings = load_settings(path)?;
    if let Ok(bind_address) = std::env::var("BIND_ADDRESS") {
        settings.bind_address = bind_address;
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_market_settings() {
        let toml_str = r#"
            listing_days = 45
            featured_days = 14
            featured_fee = "12.50"
            system_payee_id = 3
            purchase_requires_active = true
            bind_address = "127.0.0.1:9000"
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.listing_days, 45);
        assert_eq!(settings.featured_days, 14);
        assert_eq!(settings.featured_fee, dec!(12.50));
        assert_eq!(settings.system_payee_id, 3);
        assert!(settings.purchase_requires_active);
        assert_eq!(settings.bind_address, "127.0.0.1:9000");
        assert_eq!(settings.featured_fee_cents().unwrap(), 1250);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = parse_settings("listing_days = 10").unwrap();
        assert_eq!(settings.listing_days, 10);
        assert_eq!(settings.featured_days, 30);
        assert_eq!(settings.featured_fee, dec!(30.00));
        assert_eq!(settings.system_payee_id, 1);
        assert!(!settings.purchase_requires_active);
    }

    #[test]
    fn test_rejects_non_positive_window() {
        let result = parse_settings("featured_days = 0");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_rejects_negative_fee() {
        let result = parse_settings(r#"featured_fee = "-1.00""#);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings("definitely/not/here/market.toml").unwrap();
        assert_eq!(settings, MarketSettings::default());
    }
}

/// Database configuration and connection management
pub mod database;

/// Market settings (fees, windows, payee, listen address) from market.toml
pub mod market;

pub use market::MarketSettings;

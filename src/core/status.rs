//! Closed enums for advertisement status and payment type.
//!
//! Both are stored as strings. Parsing happens once, at the store boundary, and an
//! unknown string is a validation error rather than a silently accepted state.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    /// Listed at no extra cost
    Standard,
    /// Listed with a paid feature surcharge
    Featured,
    /// Terminal: bought by a buyer
    Sold,
}

impl AdStatus {
    /// Canonical stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Featured => "featured",
            Self::Sold => "sold",
        }
    }

    /// Whether the listing can still be featured or purchased.
    #[must_use]
    pub const fn is_open(self) -> bool {
        match self {
            Self::Standard | Self::Featured => true,
            Self::Sold => false,
        }
    }

    /// Stored strings that count as open (used to build store-side filters).
    ///
    /// Includes the legacy `active` spelling so rows written before normalization
    /// are still matched.
    #[must_use]
    pub const fn open_strings() -> [&'static str; 3] {
        ["standard", LEGACY_ACTIVE, "featured"]
    }

    /// Stored strings that mean [`AdStatus::Standard`].
    #[must_use]
    pub const fn standard_strings() -> [&'static str; 2] {
        ["standard", LEGACY_ACTIVE]
    }
}

/// Legacy spelling of `standard` produced by an older creation path.
const LEGACY_ACTIVE: &str = "active";

impl FromStr for AdStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" | LEGACY_ACTIVE => Ok(Self::Standard),
            "featured" => Ok(Self::Featured),
            "sold" => Ok(Self::Sold),
            other => Err(Error::validation(format!(
                "unknown advertisement status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Fee paid by a seller to feature a listing
    FeaturedAd,
    /// Buyer paying the seller for a vehicle
    Purchase,
    /// Generic transfer
    #[default]
    Wallet,
}

impl PaymentType {
    /// Canonical stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FeaturedAd => "featured_ad",
            Self::Purchase => "purchase",
            Self::Wallet => "wallet",
        }
    }

    /// All payment types, in reporting order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::FeaturedAd, Self::Purchase, Self::Wallet]
    }
}

impl FromStr for PaymentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "featured_ad" => Ok(Self::FeaturedAd),
            "purchase" => Ok(Self::Purchase),
            "wallet" => Ok(Self::Wallet),
            other => Err(Error::validation(format!("unknown payment type '{other}'"))),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buys vehicles
    Buyer,
    /// Lists vehicles
    Seller,
    /// Sees everything, including the ledger
    Admin,
}

impl Role {
    /// Canonical stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(Error::validation(format!("unknown role '{other}'"))),
        }
    }
}

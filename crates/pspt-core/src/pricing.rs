//! Domain types for countries, subscription prices, and refresh outcomes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Subscription plan level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Essential,
    Extra,
    Premium,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Essential, Tier::Extra, Tier::Premium];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Essential => "Essential",
            Tier::Extra => "Extra",
            Tier::Premium => "Premium",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "essential" => Ok(Tier::Essential),
            "extra" => Ok(Tier::Extra),
            "premium" => Ok(Tier::Premium),
            _ => Err(CoreError::InvalidTier(s.to_string())),
        }
    }
}

/// Billing period of a subscription offer. Only 1, 3, and 12 months exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DurationMonths {
    One,
    Three,
    Twelve,
}

impl DurationMonths {
    /// Maps a raw month count onto the closed set; anything else is `None`.
    #[must_use]
    pub fn from_months(months: i64) -> Option<Self> {
        match months {
            1 => Some(DurationMonths::One),
            3 => Some(DurationMonths::Three),
            12 => Some(DurationMonths::Twelve),
            _ => None,
        }
    }

    #[must_use]
    pub fn months(self) -> u8 {
        match self {
            DurationMonths::One => 1,
            DurationMonths::Three => 3,
            DurationMonths::Twelve => 12,
        }
    }
}

impl TryFrom<u8> for DurationMonths {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DurationMonths::from_months(i64::from(value))
            .ok_or(CoreError::InvalidDuration(i64::from(value)))
    }
}

impl From<DurationMonths> for u8 {
    fn from(value: DurationMonths) -> Self {
        value.months()
    }
}

impl std::fmt::Display for DurationMonths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.months())
    }
}

/// Terminal outcome of one country refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Ok,
    Cached,
    Error,
}

impl RefreshStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshStatus::Ok => "ok",
            RefreshStatus::Cached => "cached",
            RefreshStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefreshStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(RefreshStatus::Ok),
            "cached" => Ok(RefreshStatus::Cached),
            "error" => Ok(RefreshStatus::Error),
            other => Err(CoreError::InvalidRefreshStatus(other.to_string())),
        }
    }
}

/// A storefront region the tracker knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    /// ISO 3166-1 alpha-2, upper-case, unique.
    pub iso_code: String,
    /// Storefront locale slug such as `en-us`.
    pub region_identifier: String,
    /// Overrides the default subscription page URL when present.
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCountry {
    pub name: String,
    pub iso_code: String,
    pub region_identifier: String,
    pub source_url: Option<String>,
}

/// Last known price for one `(country, tier, duration)` tuple.
///
/// `currency` is whatever the storefront displayed, which is not necessarily
/// the country's local currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: i64,
    pub country_id: i64,
    pub tier: Tier,
    pub duration_months: DurationMonths,
    pub currency: String,
    pub price: Decimal,
    pub source_url: String,
    pub last_updated: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
}

/// Write model for a price row, keyed by `(country_id, tier, duration_months)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpsert {
    pub country_id: i64,
    pub tier: Tier,
    pub duration_months: DurationMonths,
    pub currency: String,
    pub price: Decimal,
    pub source_url: String,
    pub last_updated: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
}

/// A price row joined with its country's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListing {
    pub id: i64,
    pub country_id: i64,
    pub country_name: String,
    pub iso_code: String,
    pub tier: Tier,
    pub duration_months: DurationMonths,
    pub currency: String,
    pub price: Decimal,
    pub source_url: String,
    pub last_updated: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
}

/// Transient extractor output for one subscription offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPriceEntry {
    pub tier: Tier,
    pub duration_months: DurationMonths,
    pub price: Decimal,
    pub currency: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    pub country_id: i64,
    pub status: RefreshStatus,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceSortKey {
    Price,
    #[default]
    Country,
    LastUpdated,
}

impl PriceSortKey {
    /// Accepts the query-string spellings; unknown values yield `None`.
    #[must_use]
    pub fn from_query(raw: &str) -> Option<Self> {
        match raw {
            "price" => Some(PriceSortKey::Price),
            "country" => Some(PriceSortKey::Country),
            "lastUpdated" | "last_updated" => Some(PriceSortKey::LastUpdated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn from_query(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Filters for listing stored prices. Empty filter lists everything by country name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceFilter {
    /// ISO code of a single country.
    pub country: Option<String>,
    pub currency: Option<String>,
    pub tier: Option<Tier>,
    pub duration: Option<DurationMonths>,
    /// Substring matched against country name, ISO code, currency, and tier.
    pub search: Option<String>,
    pub sort_by: PriceSortKey,
    pub sort_dir: SortDirection,
}

//! Domain types for the country table and the refresh pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored country row. `name` is the natural key, unique under
/// case-insensitive comparison; `id` is the storage identity and is
/// preserved across refresh updates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    /// `Some(0.0)` when the country has no currency code, `None` when a
    /// code exists but no exchange rate was found, otherwise a computed
    /// positive estimate.
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Full write payload for a country, used both by the refresh upsert and
/// by manual create. Identity is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryData {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Body of `POST /countries`. Required fields are `Option` so validation
/// can report every missing field at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

impl NewCountry {
    /// Field-level validation. Returns the per-field error map expected by
    /// the API on failure.
    pub fn validate(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        match self.name.as_deref().map(str::trim) {
            None | Some("") => {
                errors.insert("name".to_string(), "is required".to_string());
            }
            Some(_) => {}
        }
        match self.population {
            None => {
                errors.insert("population".to_string(), "is required".to_string());
            }
            Some(p) if p < 0 => {
                errors.insert("population".to_string(), "must be non-negative".to_string());
            }
            Some(_) => {}
        }
        if self.currency_code.as_deref().map_or(true, |c| c.trim().is_empty()) {
            errors.insert("currency_code".to_string(), "is required".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of `PUT /countries/{name}`: every field optional, absent fields
/// keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

impl UpdateCountry {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.capital.is_none()
            && self.region.is_none()
            && self.population.is_none()
            && self.currency_code.is_none()
            && self.exchange_rate.is_none()
            && self.estimated_gdp.is_none()
            && self.flag_url.is_none()
    }
}

/// Raw query parameters of `GET /countries`. `sort` stays a string here:
/// unrecognised values are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> ListFilter {
        ListFilter {
            region: self.region,
            currency: self.currency,
            sort: self.sort.as_deref().and_then(SortOrder::from_query),
        }
    }
}

/// Validated filter handed to the store.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
}

impl SortOrder {
    /// `None` for anything other than the two supported values.
    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "gdp_desc" => Some(Self::GdpDesc),
            "gdp_asc" => Some(Self::GdpAsc),
            _ => None,
        }
    }
}

/// Aggregate figures for the status endpoint and the summary image.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryStats {
    pub total: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Result of one refresh pass. Ephemeral: reported to the caller, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub message: String,
    pub total: u64,
    pub last_refreshed_at: DateTime<Utc>,
}

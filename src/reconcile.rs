//! Reconciliation of raw metadata entries into canonical country records.
//!
//! One entry in, at most one [`CountryData`] out. Entries without a usable
//! name are skipped, never errored. The GDP estimate is a synthetic
//! placeholder signal: `population x U[1000, 2000] / exchange_rate`, drawn
//! fresh per record per pass, so it is intentionally non-reproducible
//! across refreshes. The rng is caller-supplied to keep this testable.

use crate::external::RawCountry;
use crate::models::CountryData;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;

/// Build the canonical record for one raw entry, or `None` when the entry
/// has no extractable name after trimming.
pub fn reconcile_entry(
    raw: &RawCountry,
    rates: &HashMap<String, f64>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Option<CountryData> {
    let name = raw.display_name()?.to_string();

    let population = raw.population.unwrap_or(0).max(0);
    let currency_code = raw.currency_code().map(str::to_string);

    // A zero or negative rate is as unusable as a missing one.
    let exchange_rate = currency_code
        .as_deref()
        .and_then(|code| rates.get(code).copied())
        .filter(|rate| *rate > 0.0);

    let estimated_gdp = derive_gdp(population, currency_code.as_deref(), exchange_rate, rng);

    Some(CountryData {
        name,
        capital: raw.capital().map(str::to_string),
        region: raw.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: raw.flag_url().map(str::to_string),
        last_refreshed_at: now,
    })
}

/// GDP derivation policy:
/// - no currency code: exactly `0`
/// - code but no rate: unknown (`None`), distinct from zero
/// - both present: `population x U[1000, 2000] / rate`
fn derive_gdp(
    population: i64,
    currency_code: Option<&str>,
    exchange_rate: Option<f64>,
    rng: &mut impl Rng,
) -> Option<f64> {
    match (currency_code, exchange_rate) {
        (None, _) => Some(0.0),
        (Some(_), None) => None,
        (Some(_), Some(rate)) => {
            let factor: u32 = rng.gen_range(1000..=2000);
            Some(population as f64 * f64::from(factor) / rate)
        }
    }
}

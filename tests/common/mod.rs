//! Shared fixtures: a scripted external source and store helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use country_data_service::error::RefreshError;
use country_data_service::external::{ExternalSource, RawCountry};
use country_data_service::store::SqliteCountryStore;
use std::collections::HashMap;

pub const FAKE_COUNTRIES_ENDPOINT: &str = "https://countries.test/v2/all";
pub const FAKE_RATES_ENDPOINT: &str = "https://rates.test/v6/latest/USD";

/// Deterministic [`ExternalSource`] for tests. Payloads are scripted and
/// either endpoint can be made to fail.
#[derive(Default)]
pub struct FakeSource {
    pub countries: Vec<RawCountry>,
    pub rates: HashMap<String, f64>,
    pub fail_countries: bool,
    pub fail_rates: bool,
}

impl FakeSource {
    pub fn new(countries: Vec<serde_json::Value>, rates: &[(&str, f64)]) -> Self {
        Self {
            countries: countries.into_iter().map(raw_country).collect(),
            rates: rates
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_rates(mut self) -> Self {
        self.fail_rates = true;
        self
    }

    pub fn failing_countries(mut self) -> Self {
        self.fail_countries = true;
        self
    }
}

#[async_trait]
impl ExternalSource for FakeSource {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, RefreshError> {
        if self.fail_countries {
            return Err(RefreshError::SourceUnavailable {
                endpoint: FAKE_COUNTRIES_ENDPOINT.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.countries.clone())
    }

    async fn fetch_rates(&self) -> Result<HashMap<String, f64>, RefreshError> {
        if self.fail_rates {
            return Err(RefreshError::SourceUnavailable {
                endpoint: FAKE_RATES_ENDPOINT.to_string(),
                reason: "HTTP 500 Internal Server Error".to_string(),
            });
        }
        Ok(self.rates.clone())
    }
}

/// Parse a JSON value into the raw metadata shape, as the fetcher would.
pub fn raw_country(value: serde_json::Value) -> RawCountry {
    serde_json::from_value(value).expect("fixture must deserialize")
}

pub async fn memory_store() -> SqliteCountryStore {
    SqliteCountryStore::in_memory()
        .await
        .expect("in-memory store")
}

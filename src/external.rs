//! Clients for the two external data sources.
//!
//! Country metadata and exchange rates come from independent HTTP APIs and
//! are fetched concurrently. Both sources are reached through the
//! [`ExternalSource`] trait so the refresh pipeline can run against test
//! doubles.
//!
//! The metadata API is not shape-stable: `name` may be a plain string or an
//! object carrying a `common` display form, `capital` a string or a list,
//! and `currencies` a list of code/name pairs or a mapping keyed by code.
//! The raw DTOs here absorb every observed variant; [`crate::reconcile`]
//! only ever sees the accessor methods.

use crate::error::RefreshError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Country name as returned by the metadata source. `Other` absorbs any
/// shape we do not recognise; such entries end up skipped, not erroring
/// the whole fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawName {
    Plain(String),
    Detailed { common: String },
    Other(serde_json::Value),
}

/// Capital city: single value or a list (some countries have several).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCapital {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrency {
    pub code: Option<String>,
}

/// Currencies: a list of `{code, ..}` entries or a map keyed by code.
/// The map variant uses `BTreeMap` so "first in iteration order" is
/// deterministic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCurrencies {
    List(Vec<RawCurrency>),
    Map(BTreeMap<String, serde_json::Value>),
    Other(serde_json::Value),
}

/// Flag reference: a bare URL or an object with per-format URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFlags {
    Url(String),
    Images {
        svg: Option<String>,
        png: Option<String>,
    },
    Other(serde_json::Value),
}

/// One country entry exactly as the metadata source returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCountry {
    pub name: Option<RawName>,
    pub capital: Option<RawCapital>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub currencies: Option<RawCurrencies>,
    pub flag: Option<String>,
    pub flags: Option<RawFlags>,
}

impl RawCountry {
    /// Canonical display name, trimmed. `None` when absent or blank.
    pub fn display_name(&self) -> Option<&str> {
        let name = match self.name.as_ref()? {
            RawName::Plain(s) => s,
            RawName::Detailed { common } => common,
            RawName::Other(_) => return None,
        };
        let trimmed = name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// First capital when several are listed.
    pub fn capital(&self) -> Option<&str> {
        match self.capital.as_ref()? {
            RawCapital::One(s) => Some(s.as_str()),
            RawCapital::Many(list) => list.first().map(String::as_str),
            RawCapital::Other(_) => None,
        }
    }

    /// One representative currency code: the first entry in iteration
    /// order, `None` when there are no currencies or the first entry has
    /// no code.
    pub fn currency_code(&self) -> Option<&str> {
        match self.currencies.as_ref()? {
            RawCurrencies::List(list) => list.first().and_then(|c| c.code.as_deref()),
            RawCurrencies::Map(map) => map.keys().next().map(String::as_str),
            RawCurrencies::Other(_) => None,
        }
    }

    /// Flag image URL, preferring the vector form when both are given.
    pub fn flag_url(&self) -> Option<&str> {
        if let Some(flags) = self.flags.as_ref() {
            match flags {
                RawFlags::Url(url) => return Some(url),
                RawFlags::Images { svg, png } => {
                    if let Some(url) = svg.as_deref().or(png.as_deref()) {
                        return Some(url);
                    }
                }
                RawFlags::Other(_) => {}
            }
        }
        self.flag.as_deref()
    }
}

/// Exchange-rate payload: rates relative to a fixed base currency.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesResponse {
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

/// Seam between the refresh pipeline and the outside world.
#[async_trait]
pub trait ExternalSource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, RefreshError>;
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>, RefreshError>;
}

/// Production source backed by a shared `reqwest` client with an explicit
/// timeout.
pub struct HttpExternalSource {
    http: reqwest::Client,
    countries_url: String,
    rates_url: String,
}

impl HttpExternalSource {
    pub fn new(
        countries_url: String,
        rates_url: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            countries_url,
            rates_url,
        })
    }

    fn unavailable(endpoint: &str, err: impl std::fmt::Display) -> RefreshError {
        RefreshError::SourceUnavailable {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, RefreshError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Self::unavailable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(url, format!("HTTP {status}")));
        }

        response.json().await.map_err(|e| Self::unavailable(url, e))
    }
}

#[async_trait]
impl ExternalSource for HttpExternalSource {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, RefreshError> {
        self.get_json(&self.countries_url).await
    }

    async fn fetch_rates(&self) -> Result<HashMap<String, f64>, RefreshError> {
        let payload: RatesResponse = self.get_json(&self.rates_url).await?;
        Ok(payload.rates)
    }
}

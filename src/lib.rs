//! Country data service.
//!
//! A small REST API over a single table of country records. A refresh
//! pipeline pulls country metadata and currency exchange rates from two
//! external sources, reconciles them into canonical records, upserts
//! them keyed on the case-insensitive name, and renders a PNG summary
//! of the result.

pub mod config;
pub mod error;
pub mod external;
pub mod models;
pub mod reconcile;
pub mod refresh;
pub mod render;
pub mod routes;
pub mod store;

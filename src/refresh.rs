//! Refresh orchestration.
//!
//! One pass: fetch both external datasets concurrently, reconcile and
//! upsert each entry sequentially, then render the summary image. Fetch
//! and storage failures abort the pass; a render failure only logs.

use crate::error::RefreshError;
use crate::external::ExternalSource;
use crate::models::RefreshOutcome;
use crate::reconcile::reconcile_entry;
use crate::render::render_summary;
use crate::store::CountryStore;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::Path;
use tracing::{info, warn};

/// Run one refresh pass. All records touched in the pass share a single
/// timestamp. Returns the upserted-record count and that timestamp.
pub async fn run_refresh(
    store: &dyn CountryStore,
    source: &dyn ExternalSource,
    rng: &mut (impl Rng + Send),
    summary_path: &Path,
) -> Result<RefreshOutcome, RefreshError> {
    let (entries, rates) = tokio::try_join!(source.fetch_countries(), source.fetch_rates())?;
    info!(
        entries = entries.len(),
        rates = rates.len(),
        "fetched external datasets"
    );

    let now = Utc::now();
    let mut total: u64 = 0;
    for raw in &entries {
        // Entries with no usable name are skipped, not errors.
        let Some(record) = reconcile_entry(raw, &rates, now, rng) else {
            continue;
        };
        store.upsert(&record).await?;
        total += 1;
    }
    info!(total, "refresh pass upserted records");

    // Best-effort: neither the aggregate queries nor a failed image ever
    // fail the refresh once the records are in.
    if let Err(err) = generate_summary(store, now, summary_path).await {
        warn!(error = %err, path = %summary_path.display(), "summary image generation failed");
    }

    Ok(RefreshOutcome {
        message: "Countries refreshed successfully".to_string(),
        total,
        last_refreshed_at: now,
    })
}

/// Query the aggregates and render the summary image for one pass. The
/// whole stage is auxiliary: the caller only logs a failure.
async fn generate_summary(
    store: &dyn CountryStore,
    generated_at: DateTime<Utc>,
    summary_path: &Path,
) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    let top = store.top_by_gdp(5).await?;
    render_summary(&stats, &top, generated_at, summary_path)?;
    Ok(())
}

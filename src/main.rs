use std::sync::Arc;

use country_data_service::config::Config;
use country_data_service::external::HttpExternalSource;
use country_data_service::routes::{create_router, AppState};
use country_data_service::store::SqliteCountryStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "country_data_service=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    info!(database_url = %config.database_url, "connecting to database");
    let store = SqliteCountryStore::connect(&config.database_url).await?;

    let source = HttpExternalSource::new(
        config.countries_url.clone(),
        config.rates_url.clone(),
        config.http_timeout,
    )?;

    let state = AppState {
        store: Arc::new(store),
        source: Arc::new(source),
        summary_path: config.summary_path(),
    };

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("server running on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

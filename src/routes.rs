//! HTTP surface: router construction and request handlers.

use crate::error::ApiError;
use crate::external::ExternalSource;
use crate::models::{CountryData, ListQuery, NewCountry, UpdateCountry};
use crate::refresh::run_refresh;
use crate::store::{is_duplicate_name, CountryStore};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CountryStore>,
    pub source: Arc<dyn ExternalSource>,
    pub summary_path: PathBuf,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(liveness))
        .route("/countries", get(list_countries).post(create_country))
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries/status", get(country_status))
        .route("/countries/image", get(summary_image))
        .route(
            "/countries/:name",
            get(get_country).put(update_country).delete(delete_country),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "message": "API is running..." }))
}

async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let countries = state.store.list(&query.into_filter()).await?;
    Ok(Json(countries))
}

async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let country = state
        .store
        .get_by_name(&name)
        .await?
        .ok_or_else(ApiError::country_not_found)?;
    Ok(Json(country))
}

async fn create_country(
    State(state): State<AppState>,
    Json(body): Json<NewCountry>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(details) = body.validate() {
        return Err(ApiError::Validation { details });
    }
    // Validated above.
    let name = body.name.unwrap_or_default();

    if state.store.get_by_name(&name).await?.is_some() {
        return Err(ApiError::BadRequest("Country already exists".to_string()));
    }

    let data = CountryData {
        name,
        capital: body.capital,
        region: body.region,
        population: body.population.unwrap_or(0),
        currency_code: body.currency_code,
        exchange_rate: body.exchange_rate,
        estimated_gdp: Some(body.estimated_gdp.unwrap_or(0.0)),
        flag_url: body.flag_url,
        last_refreshed_at: Utc::now(),
    };

    match state.store.insert(&data).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "Country added successfully" })),
        )),
        // A concurrent writer can still win the race between the existence
        // check and the insert; the constraint turns that into a clean 400.
        Err(err) if is_duplicate_name(&err) => {
            Err(ApiError::BadRequest("Country already exists".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn update_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(changes): Json<UpdateCountry>,
) -> Result<impl IntoResponse, ApiError> {
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No update data provided".to_string()));
    }

    let country = state
        .store
        .update_fields(&name, &changes, Utc::now())
        .await?
        .ok_or_else(ApiError::country_not_found)?;

    Ok(Json(json!({
        "message": "Country updated successfully",
        "country": country,
    })))
}

async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete(&name).await? {
        return Err(ApiError::country_not_found());
    }
    Ok(Json(json!({ "message": "Country deleted successfully" })))
}

async fn refresh_countries(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rng = StdRng::from_entropy();
    let outcome = run_refresh(
        state.store.as_ref(),
        state.source.as_ref(),
        &mut rng,
        &state.summary_path,
    )
    .await?;
    Ok(Json(outcome))
}

async fn country_status(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.store.stats().await?;
    Ok(Json(json!({
        "total_countries": stats.total,
        "last_refreshed_at": stats.last_refreshed_at,
    })))
}

async fn summary_image(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    match tokio::fs::read(&state.summary_path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("Summary image not found".to_string()))
        }
        Err(err) => Err(ApiError::Internal(err.into())),
    }
}

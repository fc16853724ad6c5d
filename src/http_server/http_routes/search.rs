use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::http_server::{error::ApiError, state::AppState};
use crate::services::pipeline::ResolutionError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    quality: Option<String>,
}

/// `GET /search/{*query}`, where the query may end in `/quality/<q>`
pub async fn search_by_path(
    State(app_state): State<Arc<AppState>>,
    Path(rest): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (query, quality) = split_quality_suffix(&rest);
    resolve(&app_state, query, quality).await
}

/// `GET /search?q=<query>&quality=<q>`
pub async fn search_by_param(
    State(app_state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError {
        error: ResolutionError::BadRequest {
            message: rejection.body_text(),
        },
        expose_details: app_state.expose_upstream_details,
    })?;
    resolve(
        &app_state,
        params.q.as_deref().unwrap_or_default(),
        params.quality.as_deref(),
    )
    .await
}

async fn resolve(
    app_state: &AppState,
    query: &str,
    quality: Option<&str>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(query, ?quality, "Received search request");

    let resolved = app_state
        .pipeline
        .run(query, quality)
        .await
        .map_err(|error| ApiError {
            error,
            expose_details: app_state.expose_upstream_details,
        })?;
    tracing::debug!(track_id = %resolved.track_id, "Responding with resolved URL");

    let mut body = Map::new();
    body.insert(
        app_state.response_field.key().to_string(),
        Value::String(resolved.url),
    );
    Ok(Json(Value::Object(body)))
}

fn split_quality_suffix(rest: &str) -> (&str, Option<&str>) {
    match rest.rsplit_once("/quality/") {
        Some((query, quality)) if !quality.contains('/') => (query, Some(quality)),
        _ => (rest, None),
    }
}

//! HTTP handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{Method, Uri},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::error::{AppError, AppResult, FieldError};
use crate::query::PaginationQuery;
use crate::service::{ThreatPage, ThreatStats};
use crate::threat::ThreatRecord;

/// Liveness probe
pub async fn livecheck() -> &'static str {
    "OK"
}

/// API: List threats, paginated and optionally filtered
pub async fn list_threats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> AppResult<Json<ThreatPage>> {
    let Query(query) = query.map_err(|rejection| FieldError::new("query", rejection.body_text()))?;
    let query = query.validate()?;
    Ok(Json(state.threats.list(&query).await?))
}

/// API: Fetch a single threat by id
pub async fn get_threat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ThreatRecord>> {
    let id = parse_id(&id)?;
    Ok(Json(state.threats.find_one(id).await?))
}

/// API: Aggregate counts by category and severity
pub async fn threat_stats(State(state): State<Arc<AppState>>) -> AppResult<Json<ThreatStats>> {
    Ok(Json(state.threats.stats().await?))
}

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}

fn parse_id(raw: &str) -> Result<i64, FieldError> {
    raw.trim()
        .parse()
        .map_err(|_| FieldError::new("id", "Validation failed (numeric string is expected)"))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use terraflux_common::{InterventionStatus, InterventionType, TerrafluxError};
use terraflux_store::{DateRange, FilterConfig, InterventionDraft, InterventionPatch, NumericRange};

use crate::AppState;

use super::{data, page_body, parse_id, ApiError, ApiResult, PageParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub operator: Option<String>,
    pub search: Option<String>,
    pub deployed_from: Option<DateTime<Utc>>,
    pub deployed_to: Option<DateTime<Utc>>,
    pub min_capacity: Option<f64>,
    pub max_capacity: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NearParams {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: Option<f64>,
}

fn parse_kind(raw: &str) -> Result<InterventionType, ApiError> {
    InterventionType::from_str_loose(raw).ok_or_else(|| {
        ApiError(TerrafluxError::InvalidFilter(format!(
            "'{raw}' is not a recognized intervention type"
        )))
    })
}

fn parse_status(raw: &str) -> Result<InterventionStatus, ApiError> {
    InterventionStatus::from_str_loose(raw).ok_or_else(|| {
        ApiError(TerrafluxError::InvalidFilter(format!(
            "'{raw}' is not a recognized status"
        )))
    })
}

fn filter_from(params: &ListParams) -> Result<FilterConfig, ApiError> {
    let mut filter = FilterConfig::default();
    if let Some(kind) = &params.kind {
        filter.kind = Some(parse_kind(kind)?.to_string());
    }
    if let Some(status) = &params.status {
        filter.status = Some(parse_status(status)?.to_string());
    }
    filter.reference = params.operator.clone();
    filter.search = params.search.clone();
    if params.deployed_from.is_some() || params.deployed_to.is_some() {
        filter.date_range = Some(DateRange {
            from: params.deployed_from,
            to: params.deployed_to,
        });
    }
    if params.min_capacity.is_some() || params.max_capacity.is_some() {
        filter.numeric_range = Some(NumericRange {
            field: "capacity_tonnes_co2".to_string(),
            min: params.min_capacity,
            max: params.max_capacity,
        });
    }
    Ok(filter)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<InterventionDraft>,
) -> ApiResult<impl IntoResponse> {
    let record = state.interventions.create(draft).await?;
    Ok((StatusCode::CREATED, data(record)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let filter = filter_from(&params)?;
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let result = state.interventions.list(filter, page).await?;
    Ok(page_body(result, page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.interventions.get(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<InterventionPatch>,
) -> ApiResult<impl IntoResponse> {
    let record = state.interventions.update(parse_id(&id)?, patch).await?;
    Ok(data(record))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.interventions.delete(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn by_operator(
    State(state): State<Arc<AppState>>,
    Path(operator): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.interventions.by_operator(&operator, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_kind(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let page = params.page();
    let result = state.interventions.by_kind(kind, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_status(&status)?;
    let page = params.page();
    let result = state.interventions.by_status(status, page).await?;
    Ok(page_body(result, page))
}

/// Interventions within a great-circle radius of a point, nearest first.
pub async fn near(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearParams>,
) -> ApiResult<impl IntoResponse> {
    let hits = state
        .interventions
        .near(params.lat, params.lon, params.radius_km)
        .await?;
    Ok(data(hits))
}

pub async fn total_capacity(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let total = state.interventions.total_capacity().await;
    Ok(data(serde_json::json!({ "total_capacity_tonnes_co2": total })))
}

pub async fn capacity_by_kind(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.interventions.capacity_by_kind().await))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.interventions.statistics().await))
}

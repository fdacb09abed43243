use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use terraflux_common::{OptimizationStatus, TerrafluxError};
use terraflux_store::{FilterConfig, NumericRange, OptimizationDraft, OptimizationPatch};

use crate::AppState;

use super::{data, page_body, parse_id, ApiError, ApiResult, PageParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub operator: Option<String>,
    pub grid_cell: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BestParams {
    pub n: Option<usize>,
}

const DEFAULT_BEST_N: usize = 10;

fn parse_status(raw: &str) -> Result<OptimizationStatus, ApiError> {
    OptimizationStatus::from_str_loose(raw).ok_or_else(|| {
        ApiError(TerrafluxError::InvalidFilter(format!(
            "'{raw}' is not a recognized status"
        )))
    })
}

fn filter_from(params: &ListParams) -> Result<FilterConfig, ApiError> {
    let mut filter = FilterConfig::default();
    filter.reference = params.operator.clone();
    filter.grid_cell = params.grid_cell.clone();
    filter.search = params.search.clone();
    if let Some(status) = &params.status {
        filter.status = Some(parse_status(status)?.to_string());
    }
    if params.min_score.is_some() || params.max_score.is_some() {
        filter.numeric_range = Some(NumericRange {
            field: "score".to_string(),
            min: params.min_score,
            max: params.max_score,
        });
    }
    Ok(filter)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<OptimizationDraft>,
) -> ApiResult<impl IntoResponse> {
    let record = state.optimizations.create(draft).await?;
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
    let result = state.optimizations.list(filter, page).await?;
    Ok(page_body(result, page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.optimizations.get(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<OptimizationPatch>,
) -> ApiResult<impl IntoResponse> {
    let record = state.optimizations.update(parse_id(&id)?, patch).await?;
    Ok(data(record))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.optimizations.delete(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn by_operator(
    State(state): State<Arc<AppState>>,
    Path(operator): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.optimizations.by_operator(&operator, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_grid_cell(
    State(state): State<Arc<AppState>>,
    Path(cell): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.optimizations.by_grid_cell(&cell, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_algorithm(
    State(state): State<Arc<AppState>>,
    Path(algorithm): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.optimizations.by_algorithm(&algorithm, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_status(&status)?;
    let page = params.page();
    let result = state.optimizations.by_status(status, page).await?;
    Ok(page_body(result, page))
}

pub async fn best_performing(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BestParams>,
) -> ApiResult<impl IntoResponse> {
    let n = params.n.unwrap_or(DEFAULT_BEST_N);
    Ok(data(state.optimizations.best_performing(n).await))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.optimizations.statistics().await))
}

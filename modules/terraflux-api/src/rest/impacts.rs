use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use terraflux_store::{DateRange, FilterConfig, ImpactDraft, ImpactPatch, NumericRange};

use crate::AppState;

use super::{data, page_body, parse_id, ApiResult, PageParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub grid_cell: Option<String>,
    pub observed_from: Option<DateTime<Utc>>,
    pub observed_to: Option<DateTime<Utc>>,
    pub min_effectiveness: Option<f64>,
    pub max_effectiveness: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EffectivenessRangeParams {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BestParams {
    pub n: Option<usize>,
}

const DEFAULT_BEST_N: usize = 10;

fn filter_from(params: &ListParams) -> FilterConfig {
    let mut filter = FilterConfig::default();
    filter.grid_cell = params.grid_cell.clone();
    if params.observed_from.is_some() || params.observed_to.is_some() {
        filter.date_range = Some(DateRange {
            from: params.observed_from,
            to: params.observed_to,
        });
    }
    if params.min_effectiveness.is_some() || params.max_effectiveness.is_some() {
        filter.numeric_range = Some(NumericRange {
            field: "effectiveness_score".to_string(),
            min: params.min_effectiveness,
            max: params.max_effectiveness,
        });
    }
    filter
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ImpactDraft>,
) -> ApiResult<impl IntoResponse> {
    let record = state.impacts.create(draft).await?;
    Ok((StatusCode::CREATED, data(record)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let result = state.impacts.list(filter_from(&params), page).await?;
    Ok(page_body(result, page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.impacts.get(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ImpactPatch>,
) -> ApiResult<impl IntoResponse> {
    let record = state.impacts.update(parse_id(&id)?, patch).await?;
    Ok(data(record))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.impacts.delete(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn by_intervention(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state
        .impacts
        .by_intervention(parse_id(&id)?, page)
        .await?;
    Ok(page_body(result, page))
}

pub async fn by_grid_cell(
    State(state): State<Arc<AppState>>,
    Path(cell): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.impacts.by_grid_cell(&cell, page).await?;
    Ok(page_body(result, page))
}

/// Reports with effectiveness within [min, max] inclusive.
pub async fn effectiveness_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EffectivenessRangeParams>,
) -> ApiResult<impl IntoResponse> {
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let result = state
        .impacts
        .effectiveness_range(params.min, params.max, page)
        .await?;
    Ok(page_body(result, page))
}

pub async fn best_performing(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BestParams>,
) -> ApiResult<impl IntoResponse> {
    let n = params.n.unwrap_or(DEFAULT_BEST_N);
    Ok(data(state.impacts.best_performing(n).await))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.impacts.statistics().await))
}

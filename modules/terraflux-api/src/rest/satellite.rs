use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use terraflux_common::TerrafluxError;
use terraflux_store::{DateRange, FilterConfig, GeoQuery, NumericRange, ReadingDraft, ReadingPatch};

use crate::AppState;

use super::{data, page_body, parse_id, ApiError, ApiResult, PageParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub grid_cell: Option<String>,
    pub satellite: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_quality: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CellParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Either a radius around a point or an exact grid cell.
#[derive(Debug, Deserialize)]
pub struct LocateParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
    pub grid_cell: Option<String>,
}

fn filter_from(params: &ListParams) -> FilterConfig {
    let mut filter = FilterConfig::default();
    filter.grid_cell = params.grid_cell.clone();
    filter.reference = params.satellite.clone();
    if params.from.is_some() || params.to.is_some() {
        filter.date_range = Some(DateRange {
            from: params.from,
            to: params.to,
        });
    }
    if let Some(min) = params.min_quality {
        filter.numeric_range = Some(NumericRange {
            field: "data_quality".to_string(),
            min: Some(min),
            max: None,
        });
    }
    filter
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ReadingDraft>,
) -> ApiResult<impl IntoResponse> {
    let record = state.readings.create(draft).await?;
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
    let result = state.readings.list(filter_from(&params), page).await?;
    Ok(page_body(result, page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.readings.get(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ReadingPatch>,
) -> ApiResult<impl IntoResponse> {
    let record = state.readings.update(parse_id(&id)?, patch).await?;
    Ok(data(record))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.readings.delete(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn by_grid_cell(
    State(state): State<Arc<AppState>>,
    Path(cell): Path<String>,
    Query(params): Query<CellParams>,
) -> ApiResult<impl IntoResponse> {
    let range = (params.from.is_some() || params.to.is_some()).then_some(DateRange {
        from: params.from,
        to: params.to,
    });
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let result = state.readings.by_grid_cell(&cell, range, page).await?;
    Ok(page_body(result, page))
}

/// Most recent reading for the cell. An empty cell is a success with null
/// data, not an error.
pub async fn latest_in_cell(
    State(state): State<Arc<AppState>>,
    Path(cell): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(data(state.readings.latest(&cell).await))
}

pub async fn by_satellite(
    State(state): State<Arc<AppState>>,
    Path(satellite_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.readings.by_satellite(&satellite_id, page).await?;
    Ok(page_body(result, page))
}

pub async fn time_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TimeRangeParams>,
) -> ApiResult<impl IntoResponse> {
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let range = DateRange {
        from: params.from,
        to: params.to,
    };
    let result = state.readings.time_range(range, page).await?;
    Ok(page_body(result, page))
}

/// Point-in-space lookup: `lat`/`lon` (+ optional `radius_km`) for a radius
/// query, or `grid_cell` for an exact cell match.
pub async fn locate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
) -> ApiResult<impl IntoResponse> {
    let query = match (params.lat, params.lon, params.grid_cell) {
        (Some(lat), Some(lon), None) => GeoQuery::Near {
            lat,
            lon,
            radius_km: params.radius_km,
        },
        (None, None, Some(grid_cell_id)) => GeoQuery::Cell { grid_cell_id },
        _ => {
            return Err(ApiError(TerrafluxError::InvalidFilter(
                "provide either lat+lon (with optional radius_km) or grid_cell".to_string(),
            )))
        }
    };
    Ok(data(state.readings.locate(query).await?))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.readings.statistics().await))
}

//! Read-only climate-data family, proxied from NASA Earthdata. Coordinates
//! are validated locally; provider failures surface as 502, never retried.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;

use terraflux_common::validate_coordinates;

use crate::AppState;

use super::{data, ApiResult};

#[derive(Debug, Deserialize)]
pub struct PointParams {
    pub lat: f64,
    pub lon: f64,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BiomassParams {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoricalParams {
    pub lat: f64,
    pub lon: f64,
    pub years_back: Option<u32>,
}

const DEFAULT_BIOMASS_RADIUS_KM: f64 = 10.0;
const DEFAULT_YEARS_BACK: u32 = 10;

pub async fn co2(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    Ok(data(state.earthdata.co2_concentration(
        params.lat,
        params.lon,
        params.date,
    )))
}

pub async fn temperature(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    let reading = state
        .earthdata
        .temperature(params.lat, params.lon, params.date)
        .await?;
    Ok(data(reading))
}

pub async fn biomass(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BiomassParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    let radius = params.radius_km.unwrap_or(DEFAULT_BIOMASS_RADIUS_KM);
    Ok(data(state.earthdata.biomass(params.lat, params.lon, radius)))
}

pub async fn historical(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    let years = params.years_back.unwrap_or(DEFAULT_YEARS_BACK);
    Ok(data(state.earthdata.historical_patterns(
        params.lat,
        params.lon,
        years,
    )))
}

pub async fn optimization(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    let guidance = state
        .earthdata
        .optimization_guidance(params.lat, params.lon)
        .await?;
    Ok(data(guidance))
}

pub async fn satellite_imagery(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> ApiResult<impl IntoResponse> {
    validate_coordinates(params.lat, params.lon)?;
    Ok(data(state.earthdata.satellite_imagery(
        params.lat,
        params.lon,
        params.date,
    )))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use terraflux_common::{DataSourceKind, TerrafluxError, UpdateFrequency};
use terraflux_store::{DataSourceDraft, DataSourcePatch, FilterConfig};

use crate::AppState;

use super::{data, page_body, parse_id, ApiError, ApiResult, PageParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub kind: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn parse_kind(raw: &str) -> Result<DataSourceKind, ApiError> {
    DataSourceKind::from_str_loose(raw).ok_or_else(|| {
        ApiError(TerrafluxError::InvalidFilter(format!(
            "'{raw}' is not a recognized source kind"
        )))
    })
}

fn parse_frequency(raw: &str) -> Result<UpdateFrequency, ApiError> {
    UpdateFrequency::from_str_loose(raw).ok_or_else(|| {
        ApiError(TerrafluxError::InvalidFilter(format!(
            "'{raw}' is not a recognized update frequency"
        )))
    })
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<DataSourceDraft>,
) -> ApiResult<impl IntoResponse> {
    let record = state.sources.create(draft).await?;
    Ok((StatusCode::CREATED, data(record)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let mut filter = FilterConfig::default();
    if let Some(kind) = &params.kind {
        filter.kind = Some(parse_kind(kind)?.to_string());
    }
    filter.search = params.search.clone();
    let page = PageParams {
        limit: params.limit,
        offset: params.offset,
    }
    .page();
    let result = state.sources.list(filter, page).await?;
    Ok(page_body(result, page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.sources.get(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<DataSourcePatch>,
) -> ApiResult<impl IntoResponse> {
    let record = state.sources.update(parse_id(&id)?, patch).await?;
    Ok(data(record))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.sources.delete(parse_id(&id)?).await?;
    Ok(data(record))
}

pub async fn by_provider(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.sources.by_provider(&provider, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_kind(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    let page = params.page();
    let result = state.sources.by_kind(kind, page).await?;
    Ok(page_body(result, page))
}

pub async fn active(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.sources.active(page).await?;
    Ok(page_body(result, page))
}

pub async fn by_auth(
    State(state): State<Arc<AppState>>,
    Path(requires_auth): Path<bool>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.sources.by_auth(requires_auth, page).await?;
    Ok(page_body(result, page))
}

pub async fn by_frequency(
    State(state): State<Arc<AppState>>,
    Path(frequency): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let frequency = parse_frequency(&frequency)?;
    let page = params.page();
    let result = state.sources.by_frequency(frequency, page).await?;
    Ok(page_body(result, page))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(term): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page();
    let result = state.sources.search(&term, page).await?;
    Ok(page_body(result, page))
}

pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(data(state.sources.statistics().await))
}

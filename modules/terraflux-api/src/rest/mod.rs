pub mod climate;
pub mod impacts;
pub mod interventions;
pub mod optimizations;
pub mod satellite;
pub mod sources;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use terraflux_common::TerrafluxError;
use terraflux_store::{Page, PageResult};

// --- Response envelope ---

/// `{ "success": true, "data": ... }`
pub fn data<T: Serialize>(value: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "data": value }))
}

/// One page of records plus the total match count.
pub fn page_body<T: Serialize>(result: PageResult<T>, page: Page) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "data": result.items,
        "total": result.total,
        "limit": page.limit,
        "offset": page.offset,
    }))
}

// --- Error mapping ---

pub struct ApiError(pub TerrafluxError);

impl From<TerrafluxError> for ApiError {
    fn from(err: TerrafluxError) -> Self {
        Self(err)
    }
}

impl From<earthdata_client::EarthdataError> for ApiError {
    fn from(err: earthdata_client::EarthdataError) -> Self {
        Self(TerrafluxError::Upstream(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TerrafluxError::Validation { .. }
            | TerrafluxError::InvalidFilter(_)
            | TerrafluxError::InvalidCoordinate(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            TerrafluxError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            TerrafluxError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            TerrafluxError::Upstream(e) => {
                warn!(error = %e, "Upstream provider failure");
                (StatusCode::BAD_GATEWAY, self.0.to_string())
            }
            TerrafluxError::Internal(e) => {
                warn!(error = %e, "Unhandled internal error");
                // No internal detail leaks to the caller.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// --- Shared query structs ---

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageParams {
    pub fn page(&self) -> Page {
        Page::new(self.offset, self.limit)
    }
}

// --- Helpers ---

/// Parse a path id, reporting a malformed one in the error envelope rather
/// than the framework's plain-text rejection.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError(TerrafluxError::validation(vec![format!(
            "id '{raw}' is not a valid UUID"
        )]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_cap_limit() {
        let params = PageParams {
            limit: Some(10_000),
            offset: None,
        };
        let page = params.page();
        assert_eq!(page.limit, terraflux_store::MAX_PAGE_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_err());
        assert!(parse_id("123e4567-e89b-12d3-a456-426614174000").is_ok());
    }

    #[test]
    fn envelope_shapes() {
        let Json(body) = data(serde_json::json!({"x": 1}));
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["x"], 1);

        let Json(body) = page_body(
            PageResult {
                items: vec![1, 2, 3],
                total: 42,
            },
            Page::new(Some(3), Some(3)),
        );
        assert_eq!(body["total"], 42);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["offset"], 3);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(3));
    }
}

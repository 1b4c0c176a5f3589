use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use pspt_pricing::{BatchOutcome, CountryRefresh, RefreshJob, RefreshTarget};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_pricing_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct RefreshRequest {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub force: bool,
    pub country_id: Option<i64>,
    pub iso_code: Option<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum RefreshResponse {
    Batch(BatchOutcome),
    Country(CountryRefresh),
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateJobRequest {
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_stale_only")]
    pub stale_only: bool,
}

impl Default for CreateJobRequest {
    fn default() -> Self {
        Self {
            force: false,
            stale_only: true,
        }
    }
}

fn default_stale_only() -> bool {
    true
}

/// Synchronous refresh: a batch window when `all` is set, otherwise one country.
pub(super) async fn refresh_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let refresh = &state.services.refresh;

    let outcome = if body.all {
        refresh
            .refresh_batch(body.force, body.offset, body.limit)
            .await
            .map(RefreshResponse::Batch)
    } else {
        match RefreshTarget::from_parts(body.country_id, body.iso_code.as_deref()) {
            Ok(target) => refresh
                .refresh_one(&target, body.force)
                .await
                .map(RefreshResponse::Country),
            Err(e) => Err(e),
        }
    };
    let response = outcome.map_err(|e| map_pricing_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(response, req_id.0)))
}

pub(super) async fn create_refresh_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<CreateJobRequest>>,
) -> (StatusCode, Json<ApiResponse<RefreshJob>>) {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let job = state
        .services
        .jobs
        .create_job(body.force, body.stale_only)
        .await;

    (StatusCode::ACCEPTED, Json(ApiResponse::new(job, req_id.0)))
}

pub(super) async fn get_refresh_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<RefreshJob>>, ApiError> {
    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| {
        ApiError::new(
            &req_id.0,
            "bad_request",
            format!("'{raw_id}' is not a valid job id"),
        )
    })?;

    let job = state.services.jobs.get(id).await.ok_or_else(|| {
        ApiError::new(&req_id.0, "not_found", format!("refresh job {id} not found"))
    })?;

    Ok(Json(ApiResponse::new(job, req_id.0)))
}

//! `GET/POST /api/v1/countries` and `DELETE /api/v1/countries/{id}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use pspt_core::{Country, NewCountry};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateCountryRequest {
    pub name: String,
    pub iso_code: String,
    pub region_identifier: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedCountry {
    pub id: i64,
    pub deleted: bool,
}

/// Lists known countries after a best-effort discovery sync.
pub(super) async fn list_countries(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Country>>>, ApiError> {
    state.services.refresh.sync_discovered_countries().await;

    let countries = state
        .services
        .store
        .list_countries()
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(countries, req_id.0)))
}

pub(super) async fn create_country(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCountryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Country>>), ApiError> {
    let new_country = validate_new_country(&req_id.0, body)?;

    let created = state
        .services
        .store
        .insert_country(&new_country)
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    tracing::info!(iso_code = %created.iso_code, id = created.id, "country created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(created, req_id.0))))
}

pub(super) async fn delete_country(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedCountry>>, ApiError> {
    let deleted = state
        .services
        .store
        .delete_country(id)
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    if !deleted {
        return Err(ApiError::new(
            &req_id.0,
            "not_found",
            format!("country {id} not found"),
        ));
    }

    Ok(Json(ApiResponse::new(DeletedCountry { id, deleted }, req_id.0)))
}

/// Trims every field, upper-cases the ISO code, and drops a blank source URL.
pub(super) fn validate_new_country(
    request_id: &str,
    body: CreateCountryRequest,
) -> Result<NewCountry, ApiError> {
    let invalid = |message: &str| ApiError::new(request_id, "validation_error", message);

    let name = body.name.trim().to_string();
    if !(2..=100).contains(&name.chars().count()) {
        return Err(invalid("name must be 2-100 characters"));
    }

    let iso_code = body.iso_code.trim().to_ascii_uppercase();
    if iso_code.len() != 2 || !iso_code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(invalid("iso_code must be a 2-letter code"));
    }

    let region_identifier = body.region_identifier.trim().to_string();
    if !(2..=20).contains(&region_identifier.chars().count()) {
        return Err(invalid("region_identifier must be 2-20 characters"));
    }

    let source_url = body
        .source_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(url) = &source_url {
        reqwest::Url::parse(url).map_err(|_| invalid("source_url must be an absolute URL"))?;
    }

    Ok(NewCountry {
        name,
        iso_code,
        region_identifier,
        source_url,
    })
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use pspt_core::{DurationMonths, PriceFilter, PriceSortKey, SortDirection, Tier};
use pspt_pricing::PricedRow;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct PriceQuery {
    pub country: Option<String>,
    pub currency: Option<String>,
    pub tier: Option<String>,
    pub duration: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/// Stored prices with reference-currency conversions.
pub(super) async fn list_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<ApiResponse<Vec<PricedRow>>>, ApiError> {
    let filter = parse_filter(&req_id.0, query)?;

    let rows = state
        .services
        .store
        .list_prices(&filter)
        .await
        .map_err(|e| map_store_error(&req_id.0, &e))?;
    let priced = state.services.quotes.present(rows).await;

    Ok(Json(ApiResponse::new(priced, req_id.0)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(super) fn parse_filter(request_id: &str, query: PriceQuery) -> Result<PriceFilter, ApiError> {
    let invalid = |message: String| ApiError::new(request_id, "validation_error", message);

    let tier = non_blank(query.tier)
        .map(|t| t.parse::<Tier>().map_err(|e| invalid(e.to_string())))
        .transpose()?;
    let duration = query
        .duration
        .map(|d| {
            DurationMonths::from_months(d)
                .ok_or_else(|| invalid(format!("duration must be 1, 3 or 12, got {d}")))
        })
        .transpose()?;
    let sort_by = non_blank(query.sort_by)
        .map(|s| {
            PriceSortKey::from_query(&s).ok_or_else(|| {
                invalid(format!("sort_by must be price, country or lastUpdated, got '{s}'"))
            })
        })
        .transpose()?
        .unwrap_or_default();
    let sort_dir = non_blank(query.sort_dir)
        .map(|s| {
            SortDirection::from_query(&s)
                .ok_or_else(|| invalid(format!("sort_dir must be asc or desc, got '{s}'")))
        })
        .transpose()?
        .unwrap_or_default();

    Ok(PriceFilter {
        country: non_blank(query.country).map(|c| c.to_ascii_uppercase()),
        currency: non_blank(query.currency).map(|c| c.to_ascii_uppercase()),
        tier,
        duration,
        search: non_blank(query.search),
        sort_by,
        sort_dir,
    })
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use pspt_pricing::GameSearchOutcome;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_pricing_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct GamePriceQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Searches one window of storefronts for the best-matching purchasable title.
pub(super) async fn search_game_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<GamePriceQuery>,
) -> Result<Json<ApiResponse<GameSearchOutcome>>, ApiError> {
    let outcome = state
        .services
        .games
        .search(&query.name, query.offset, query.limit)
        .await
        .map_err(|e| map_pricing_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse::new(outcome, req_id.0)))
}

mod countries;
mod games;
mod prices;
mod refresh;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pspt_core::StoreError;
use pspt_pricing::{PricingError, Services};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub services: Services,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    countries: Option<usize>,
    prices: Option<i64>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: &str, error: &StoreError) -> ApiError {
    match error {
        StoreError::DuplicateCountry(iso) => ApiError::new(
            request_id,
            "conflict",
            format!("country with ISO code {iso} already exists"),
        ),
        StoreError::Backend(_) => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_pricing_error(request_id: &str, error: &PricingError) -> ApiError {
    match error {
        PricingError::CountryNotFound(_) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        PricingError::MissingTarget | PricingError::EmptyQuery => {
            ApiError::new(request_id, "bad_request", error.to_string())
        }
        PricingError::Store(e) => map_store_error(request_id, e),
        PricingError::Scraper(_) | PricingError::Fx(_) => {
            tracing::error!(error = %error, "pricing service failure");
            ApiError::new(request_id, "internal_error", "pricing service failure")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/countries",
            get(countries::list_countries).post(countries::create_country),
        )
        .route("/api/v1/countries/{id}", delete(countries::delete_country))
        .route("/api/v1/prices", get(prices::list_prices))
        .route("/api/v1/refresh", post(refresh::refresh_prices))
        .route("/api/v1/refresh/jobs", post(refresh::create_refresh_job))
        .route("/api/v1/refresh/jobs/{id}", get(refresh::get_refresh_job))
        .route("/api/v1/game-prices", get(games::search_game_prices))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    if let Err(e) = pspt_db::ping(&state.pool).await {
        tracing::warn!(error = %e, "health check: database unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::new(
                HealthData {
                    status: "degraded",
                    database: "unavailable",
                    countries: None,
                    prices: None,
                },
                req_id.0,
            )),
        );
    }

    let store = &state.services.store;
    let countries = store.list_countries().await.map(|c| c.len()).ok();
    let prices = store.count_prices().await.ok();

    (
        StatusCode::OK,
        Json(ApiResponse::new(
            HealthData {
                status: "ok",
                database: "ok",
                countries,
                prices,
            },
            req_id.0,
        )),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

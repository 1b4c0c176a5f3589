use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller-supplied ids longer than this are replaced with a generated one.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id for one request, echoed in every response envelope.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuses the caller's id when it is short printable ASCII, otherwise
    /// mints a UUID.
    fn from_header(value: Option<&HeaderValue>) -> Self {
        let supplied = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| {
                !v.is_empty()
                    && v.len() <= MAX_REQUEST_ID_LEN
                    && v.bytes().all(|b| b.is_ascii_graphic())
            });
        Self(supplied.map_or_else(|| Uuid::new_v4().to_string(), str::to_string))
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    used: usize,
}

/// Request budget per fixed window, shared by every `/api/v1` route except
/// health.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    length: Duration,
    window: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, length: Duration) -> Self {
        Self {
            budget,
            length,
            window: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(budget: usize) -> Self {
        Self::new(budget, Duration::from_secs(60))
    }

    /// Spends one request from the current window. On refusal returns how
    /// long until the window resets.
    async fn try_acquire(&self) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        let elapsed = window.opened_at.elapsed();
        if elapsed >= self.length {
            window.opened_at = Instant::now();
            window.used = 0;
        } else if window.used >= self.budget {
            return Err(self.length - elapsed);
        }
        window.used += 1;
        Ok(())
    }
}

/// Attaches a [`RequestId`] extension and mirrors it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_header(req.headers().get(REQUEST_ID_HEADER));
    let header = HeaderValue::from_str(&id.0).ok();
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    if let Some(header) = header {
        res.headers_mut().insert(REQUEST_ID_HEADER, header);
    }
    res
}

/// Rejects with `429 rate_limited` once the window budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let Err(reset_in) = limit.try_acquire().await else {
        return next.run(req).await;
    };

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    tracing::warn!(%request_id, path = %req.uri().path(), "request budget exhausted");

    let mut res = ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    let retry_secs = reset_in.as_secs() + u64::from(reset_in.subsec_nanos() > 0);
    res.headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
    res
}

//! Response construction for logo outcomes and errors

use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::AppError;
use crate::models::{LogoResponse, RateLimitDecision};
use crate::services::CacheHeaderPolicy;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// JSON body for every non-image response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Translate a resolution outcome into an HTTP response
pub fn logo_response(outcome: LogoResponse) -> Response {
    match (outcome.success, outcome.logo_bytes, outcome.metadata) {
        (true, Some(bytes), Some(metadata)) => {
            let mut headers = header_map(CacheHeaderPolicy::for_logo(&metadata, outcome.from_cache));
            insert_header(&mut headers, header::CONTENT_TYPE, &metadata.mime_type());
            (StatusCode::OK, headers, bytes).into_response()
        }
        (true, None, Some(metadata)) => {
            let location = outcome.logo_url.unwrap_or(metadata.source_url);
            let mut headers = header_map(CacheHeaderPolicy::for_not_found());
            insert_header(&mut headers, header::LOCATION, &location);
            (StatusCode::FOUND, headers).into_response()
        }
        _ => {
            let message = outcome.error.unwrap_or_else(|| "logo not found".to_string());
            (
                StatusCode::NOT_FOUND,
                header_map(CacheHeaderPolicy::for_not_found()),
                Json(ErrorResponse::new(message)),
            )
                .into_response()
        }
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message) = match &error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
        AppError::RateLimited { reset_at } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate limit exceeded, resets at {}", reset_at.to_rfc3339()),
        ),
        AppError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "External service communication failed".to_string(),
        ),
        AppError::Storage(_) | AppError::Configuration { .. } | AppError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };

    if !error.is_client_outcome() {
        error!("Request failed: {}", error);
    }

    (status, Json(ErrorResponse::new(message))).into_response()
}

/// 429 with `Retry-After` and the exhausted quota headers
pub fn rate_limited_response(error: AppError, limit: Option<u32>) -> Response {
    let AppError::RateLimited { reset_at } = error else {
        return handle_error(error);
    };
    let retry_after = (reset_at - Utc::now()).num_seconds().max(0);

    let mut response = handle_error(error);
    let headers = response.headers_mut();
    insert_header(headers, header::RETRY_AFTER, &retry_after.to_string());
    if let Some(limit) = limit {
        insert_header(headers, HeaderName::from_static(RATE_LIMIT_LIMIT), &limit.to_string());
    }
    insert_header(headers, HeaderName::from_static(RATE_LIMIT_REMAINING), "0");
    insert_header(
        headers,
        HeaderName::from_static(RATE_LIMIT_RESET),
        &reset_at.timestamp().to_string(),
    );
    response
}

/// Attach the quota headers for a checked request
pub fn with_rate_limit_headers(mut response: Response, decision: Option<RateLimitDecision>) -> Response {
    if let Some(decision) = decision {
        let headers = response.headers_mut();
        insert_header(headers, HeaderName::from_static(RATE_LIMIT_LIMIT), &decision.limit.to_string());
        insert_header(
            headers,
            HeaderName::from_static(RATE_LIMIT_REMAINING),
            &decision.remaining.to_string(),
        );
        insert_header(
            headers,
            HeaderName::from_static(RATE_LIMIT_RESET),
            &decision.reset_at.timestamp().to_string(),
        );
    }
    response
}

fn header_map(pairs: Vec<(&'static str, String)>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        insert_header(&mut headers, HeaderName::from_static(name), &value);
    }
    headers
}

/// Values that are not valid header text are dropped
fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

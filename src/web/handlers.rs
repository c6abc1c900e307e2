//! Request handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::{LogoFormat, LogoRequest};

use super::AppState;
use super::responses::{handle_error, logo_response, rate_limited_response, with_rate_limit_headers};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ANONYMOUS_CLIENT: &str = "anonymous";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Query parameters shared by the logo endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoQuery {
    pub name: Option<String>,
    pub format: Option<String>,
    pub size: Option<u32>,
    pub greyscale: Option<bool>,
    pub nocache: Option<bool>,
    pub token: Option<String>,
}

impl LogoQuery {
    fn apply(&self, mut request: LogoRequest) -> AppResult<LogoRequest> {
        if let Some(format) = self.format.as_deref().filter(|f| !f.trim().is_empty()) {
            request = request.with_format(LogoFormat::from_str(format)?);
        }
        if let Some(size) = self.size {
            request = request.with_size(size);
        }
        request = request.with_greyscale(self.greyscale.unwrap_or(false));
        if self.nocache.unwrap_or(false) {
            request = request.without_cache();
        }
        Ok(request)
    }

    /// `X-API-Key` header, then `token` query parameter, then anonymous
    fn client_key(&self, headers: &HeaderMap) -> String {
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| self.token.as_deref().map(str::trim).filter(|v| !v.is_empty()))
            .unwrap_or(ANONYMOUS_CLIENT)
            .to_string()
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_logo_by_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<LogoQuery>,
    headers: HeaderMap,
) -> Response {
    debug!(domain = %domain, "GET /logo/{{domain}}");
    resolve(&state, LogoRequest::for_domain(domain), &query, &headers).await
}

pub async fn get_logo_by_name(
    State(state): State<AppState>,
    Query(query): Query<LogoQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(name) = query.name.clone() else {
        return handle_error(AppError::validation("the 'name' query parameter is required"));
    };
    debug!(name = %name, "GET /logo?name=");
    resolve(&state, LogoRequest::for_company(name), &query, &headers).await
}

pub async fn delete_logo(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<LogoQuery>,
) -> Response {
    let request = match query.apply(LogoRequest::for_domain(domain)) {
        Ok(request) => request,
        Err(e) => return handle_error(e),
    };
    match state.service.invalidate(request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => handle_error(e),
    }
}

async fn resolve(state: &AppState, request: LogoRequest, query: &LogoQuery, headers: &HeaderMap) -> Response {
    let request = match query.apply(request) {
        Ok(request) => request,
        Err(e) => return handle_error(e),
    };
    let client_key = query.client_key(headers);

    match state.service.resolve_with_limit(request, Some(&client_key)).await {
        Ok((outcome, decision)) => with_rate_limit_headers(logo_response(outcome), decision),
        Err(e @ AppError::RateLimited { .. }) => {
            rate_limited_response(e, state.service.rate_limit_quota())
        }
        Err(e) => handle_error(e),
    }
}

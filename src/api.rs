//! Read-only JSON endpoints.
//!
//! - `GET /health` - liveness
//! - `GET /news/:source/:limit` - normalized feed of one source; `limit` must be 1..=`MAX_FEED_LIMIT`

use crate::consts::{find_source, limits};
use crate::error::FetchError;
use crate::logic::Services;
use crate::models::FeedRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub fn create_router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/news/:source/:limit", get(news_handler))
        .with_state(services)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unknown source `{0}`")]
    UnknownSource(String),
    #[error("limit must be an integer between 1 and {max}, got `{raw}`")]
    BadLimit { raw: String, max: usize },
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::UnknownSource(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SOURCE"),
            ApiError::BadLimit { .. } => (StatusCode::BAD_REQUEST, "BAD_LIMIT"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED"),
        };
        (status, Json(ErrorResponse { error: self.to_string(), code })).into_response()
    }
}

fn parse_limit(raw: &str) -> Result<usize, ApiError> {
    match raw.parse::<usize>() {
        Ok(n) if (1..=limits::MAX_FEED_LIMIT).contains(&n) => Ok(n),
        _ => Err(ApiError::BadLimit { raw: raw.to_string(), max: limits::MAX_FEED_LIMIT }),
    }
}

async fn news_handler(
    State(services): State<Arc<Services>>,
    Path((source, limit)): Path<(String, String)>,
) -> Result<Json<FeedRecord>, ApiError> {
    let source = find_source(&source).ok_or(ApiError::UnknownSource(source))?;
    let limit = parse_limit(&limit)?;

    let feed = services.news.fetch(source, limit).await.map_err(|e| {
        log::error!("GET /news/{}/{} failed: {}", source.key, limit, e);
        e
    })?;
    Ok(Json(feed))
}

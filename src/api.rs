use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::batch;
use crate::extractor::{extract_page, ScrapeResponse};
use crate::fetcher::{fetch_html, is_http_url, FetchError, SINGLE_PAGE_TIMEOUT};
use crate::kijiji::{is_kijiji_host, scrape_listing_from_html, KijijiScrapeResult};
use crate::live;
use crate::search::{crawl_search, KijijiSearchResponse};

#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
}

#[derive(Deserialize, ToSchema)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct KijijiSearchRequest {
    pub url: String,
    pub pages: Option<i64>,
}

#[derive(Deserialize, ToSchema)]
pub struct BatchScrapeRequest {
    /// Newline-separated URL list; non-URL lines are discarded.
    pub urls: String,
}

/// Boundary error. Every variant serializes as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upstream(u16),
    Internal(String),
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidUrl => ApiError::BadRequest(e.to_string()),
            FetchError::UpstreamStatus(code) => ApiError::Upstream(code),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Upstream(code) => (
                StatusCode::BAD_GATEWAY,
                format!("Fetch failed with status {}", code),
            ),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/api/ping",
    responses((status = 200, description = "Health check")),
    tag = "scraper"
)]
pub async fn ping() -> Json<serde_json::Value> {
    let message = env::var("PING_MESSAGE").unwrap_or_else(|_| "ping".to_string());
    Json(json!({ "message": message }))
}

#[utoipa::path(
    post,
    path = "/api/scrape",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Generic page extraction", body = ScrapeResponse),
        (status = 400, description = "Invalid URL"),
        (status = 502, description = "Upstream fetch failed")
    ),
    tag = "scraper"
)]
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    if !is_http_url(&payload.url) {
        return Err(ApiError::BadRequest("Valid http(s) URL required".to_string()));
    }
    let html = fetch_html(&state.client, &payload.url, SINGLE_PAGE_TIMEOUT).await?;
    Ok(Json(extract_page(&payload.url, &html)))
}

#[utoipa::path(
    post,
    path = "/api/scrape/kijiji",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Listing extraction", body = KijijiScrapeResult),
        (status = 400, description = "Invalid or off-domain URL"),
        (status = 502, description = "Upstream fetch failed")
    ),
    tag = "scraper"
)]
pub async fn scrape_kijiji(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<Json<KijijiScrapeResult>, ApiError> {
    if !is_http_url(&payload.url) || !is_kijiji_host(&payload.url) {
        return Err(ApiError::BadRequest(
            "Provide a valid kijiji.ca listing URL".to_string(),
        ));
    }
    let html = fetch_html(&state.client, &payload.url, SINGLE_PAGE_TIMEOUT).await?;
    Ok(Json(scrape_listing_from_html(&payload.url, &html)))
}

#[utoipa::path(
    post,
    path = "/api/scrape/kijiji/search",
    request_body = KijijiSearchRequest,
    responses(
        (status = 200, description = "Crawled search results", body = KijijiSearchResponse),
        (status = 400, description = "Invalid or off-domain URL"),
        (status = 500, description = "Crawl failed")
    ),
    tag = "scraper"
)]
pub async fn scrape_kijiji_search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<KijijiSearchRequest>,
) -> Result<Json<KijijiSearchResponse>, ApiError> {
    if !is_http_url(&payload.url) || !is_kijiji_host(&payload.url) {
        return Err(ApiError::BadRequest("Provide a valid kijiji.ca URL".to_string()));
    }
    let result = crawl_search(&state.client, &payload.url, payload.pages)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/scrape/kijiji/live",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Listing extraction via rendering pass", body = KijijiScrapeResult),
        (status = 400, description = "Invalid or off-domain URL"),
        (status = 500, description = "Live and static scrape both failed")
    ),
    tag = "scraper"
)]
pub async fn scrape_kijiji_live(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<Json<KijijiScrapeResult>, ApiError> {
    if !is_http_url(&payload.url) || !is_kijiji_host(&payload.url) {
        return Err(ApiError::BadRequest(
            "Provide a valid kijiji.ca listing URL".to_string(),
        ));
    }

    match live::scrape_listing_live(&payload.url).await {
        Ok(result) => Ok(Json(result)),
        Err(live_err) => {
            tracing::warn!("Live scrape failed, falling back to static fetch: {}", live_err);
            match fetch_html(&state.client, &payload.url, SINGLE_PAGE_TIMEOUT).await {
                Ok(html) => Ok(Json(scrape_listing_from_html(&payload.url, &html))),
                Err(_) => Err(ApiError::Internal(live_err.to_string())),
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/scrape/batch",
    request_body = BatchScrapeRequest,
    responses(
        (status = 200, description = "Pipe-delimited report, one row per retained URL", body = String)
    ),
    tag = "scraper"
)]
pub async fn scrape_batch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchScrapeRequest>,
) -> String {
    batch::run_batch(&state.client, &payload.urls).await.join("\n")
}

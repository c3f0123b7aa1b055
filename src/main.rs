mod api;
mod batch;
mod extractor;
mod fetcher;
mod kijiji;
mod live;
mod search;

use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::ping,
        api::scrape,
        api::scrape_kijiji,
        api::scrape_kijiji_search,
        api::scrape_kijiji_live,
        api::scrape_batch
    ),
    components(
        schemas(
            api::ScrapeRequest,
            api::KijijiSearchRequest,
            api::BatchScrapeRequest,
            crate::extractor::ScrapeLink,
            crate::extractor::ScrapeResponse,
            crate::kijiji::KijijiScrapeResult,
            crate::search::KijijiSearchResponse
        )
    ),
    tags(
        (name = "scraper", description = "Scraping API")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let client = fetcher::build_http_client()?;
    let state = Arc::new(api::AppState { client });

    let app = Router::new()
        .merge(SwaggerUi::new("/scraper-swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/ping", get(api::ping))
        .route("/api/scrape", post(api::scrape))
        .route("/api/scrape/kijiji", post(api::scrape_kijiji))
        .route("/api/scrape/kijiji/live", post(api::scrape_kijiji_live))
        .route("/api/scrape/kijiji/search", post(api::scrape_kijiji_search))
        .route("/api/scrape/batch", post(api::scrape_batch))
        .nest_service("/", ServeDir::new("static")) // Serve browser shell build
        .with_state(state);

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("🚀 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

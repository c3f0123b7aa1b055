use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::fetcher::{fetch_html, FetchError, SINGLE_PAGE_TIMEOUT};
use crate::kijiji::{
    extract_listing_links, is_listing_url, scrape_listing_from_html, with_page, KijijiScrapeResult,
};

pub const MAX_SEARCH_PAGES: i64 = 20;

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KijijiSearchResponse {
    pub total_links: usize,
    pub results: Vec<KijijiScrapeResult>,
}

/// Clamps the requested page count to [1, 20]; missing or nonsense values
/// behave as a single page.
pub fn clamp_pages(pages: Option<i64>) -> u32 {
    pages.unwrap_or(1).clamp(1, MAX_SEARCH_PAGES) as u32
}

/// Crawls a search URL across up to `pages` result pages, collects listing
/// links into one deduplicated set, then scrapes every link.
///
/// Failure policy: a failed search-page fetch aborts the whole crawl; a
/// failed listing fetch only drops that listing, so `results` may be shorter
/// than `totalLinks`.
pub async fn crawl_search(
    client: &Client,
    url: &str,
    pages: Option<i64>,
) -> Result<KijijiSearchResponse, FetchError> {
    let count = clamp_pages(pages);
    let mut all_links: HashSet<String> = HashSet::new();

    if is_listing_url(url) {
        // Already an ad page: nothing to paginate.
        all_links.insert(url.to_string());
    } else {
        println!("🔎 Crawling {} search page(s) from {}", count, url);
        for page in 1..=count {
            let page_url = with_page(url, page);
            let html = fetch_html(client, &page_url, SINGLE_PAGE_TIMEOUT).await?;
            let found = extract_listing_links(&html, &page_url);
            println!("🔗 Page {}: {} listing link(s)", page, found.len());
            all_links.extend(found);
        }
    }

    let total_links = all_links.len();
    let mut results = Vec::new();
    for link in &all_links {
        match fetch_html(client, link, SINGLE_PAGE_TIMEOUT).await {
            Ok(html) => results.push(scrape_listing_from_html(link, &html)),
            Err(e) => {
                eprintln!("⚠️ Skipping listing {}: {}", link, e);
            }
        }
    }
    println!("✅ Scraped {}/{} listing(s)", results.len(), total_links);

    Ok(KijijiSearchResponse {
        total_links,
        results,
    })
}

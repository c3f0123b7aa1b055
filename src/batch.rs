use reqwest::Client;
use serde::Serialize;

use crate::extractor::{extract_page, ScrapeResponse};
use crate::fetcher::{fetch_html, is_http_url, FetchError, SINGLE_PAGE_TIMEOUT};
use crate::kijiji::{is_kijiji_host, scrape_listing_from_html, KijijiScrapeResult};

/// Outcome of one batch entry, discriminated once at dispatch time.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScrapeOutcome {
    Generic(ScrapeResponse),
    Listing(KijijiScrapeResult),
}

/// Trims each line and keeps only those that look like http(s) URLs.
/// Discarded lines produce no report row at all.
pub fn parse_batch_input(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| is_http_url(line))
        .map(str::to_string)
        .collect()
}

async fn dispatch(client: &Client, url: &str) -> Result<ScrapeOutcome, FetchError> {
    let html = fetch_html(client, url, SINGLE_PAGE_TIMEOUT).await?;
    if is_kijiji_host(url) {
        Ok(ScrapeOutcome::Listing(scrape_listing_from_html(url, &html)))
    } else {
        Ok(ScrapeOutcome::Generic(extract_page(url, &html)))
    }
}

/// Pipe-delimited report row: url | phone | model-or-title | price | address.
fn report_row(url: &str, outcome: Option<&ScrapeOutcome>) -> String {
    match outcome {
        Some(ScrapeOutcome::Listing(r)) => format!(
            "{}|{}|{}|{}|{}",
            url,
            r.phone.as_deref().unwrap_or(""),
            r.model.as_deref().unwrap_or(""),
            r.price.as_deref().unwrap_or(""),
            r.address.as_deref().unwrap_or("")
        ),
        Some(ScrapeOutcome::Generic(r)) => {
            format!("{}||{}||", url, r.title.as_deref().unwrap_or(""))
        }
        None => format!("{}||||", url),
    }
}

/// Runs every retained URL sequentially in input order. A failed entry is
/// reported as a blanked row, never dropped, so row positions match the
/// retained input lines.
pub async fn run_batch(client: &Client, input: &str) -> Vec<String> {
    let urls = parse_batch_input(input);
    let mut rows = Vec::with_capacity(urls.len());

    for url in &urls {
        let row = match dispatch(client, url).await {
            Ok(outcome) => report_row(url, Some(&outcome)),
            Err(e) => {
                eprintln!("⚠️ Batch entry failed for {}: {}", url, e);
                report_row(url, None)
            }
        };
        rows.push(row);
    }
    rows
}

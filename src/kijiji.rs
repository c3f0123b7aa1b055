use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;
use utoipa::ToSchema;

use crate::extractor::clean_text;

pub const KIJIJI_HOST: &str = "kijiji.ca";

// Structural selectors for the known listing-page regions. Kijiji ships
// generated class names, so these go stale on frontend redeploys; the phone
// field degrades through the fallback chain below instead of to nothing.
const SEL_PHONE: &str = "#base-layout-main-wrapper > div.sc-81698752-0.bNPVmS > div.sc-81698752-2.ldPhHG > section > div.sc-30b4d0e2-3.iFFiBy > div > div.sc-eb45309b-0.vAthl.sc-30b4d0e2-6.iqmXm";
const SEL_MODEL: &str = "#base-layout-main-wrapper > div.sc-81698752-0.bNPVmS > div.sc-81698752-2.ldPhHG > div:nth-child(2) > div.sc-1f51e79f-0.QJUhf > h1";
const SEL_PRICE: &str = "#base-layout-main-wrapper > div.sc-81698752-0.bNPVmS > div.sc-81698752-2.ldPhHG > div:nth-child(2) > div.sc-1f51e79f-0.hVjQcj > div > div > div > p";
const SEL_ADDRESS: &str = "#base-layout-main-wrapper > div.sc-81698752-0.bNPVmS > div.sc-81698752-2.ldPhHG > section > div.sc-30b4d0e2-2.jFnPsI > div > div > div.sc-eb45309b-0.bEMmoW > div > div > button";
const SEL_DESCRIPTION: &str = "#base-layout-main-wrapper > div.sc-81698752-0.bNPVmS > div.sc-81698752-2.ldPhHG > div:nth-child(2) > div.sc-1f51e79f-0.sc-31977afe-0.sc-ea528b23-1.dWsjGh.kgrFRj.kqdDwo > div.sc-69f589a8-0.fqzJRP > div.sc-ea528b23-0.bmKHcm > div";

/// North-American phone number: optional +1/1 prefix, optionally
/// parenthesized area code, space/dot/hyphen separators.
pub(crate) static CA_PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+?1[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?)\d{3}[-.\s]?\d{4}").unwrap());

static TELEPHONE_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"telephone"\s*:\s*"([^"]+)""#).unwrap());

/// Listing paths end in a numeric ad id of at least 7 digits.
static LISTING_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[0-9]{7,}$").unwrap());

static PAGE_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([?&]page=)\d+").unwrap());

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct KijijiScrapeResult {
    pub url: String,
    pub phone: Option<String>,
    pub model: Option<String>,
    pub price: Option<String>,
    pub address: Option<String>,
}

/// True when the URL's host is kijiji.ca or one of its subdomains.
pub fn is_kijiji_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| h == KIJIJI_HOST || h.ends_with(".kijiji.ca"))
        .unwrap_or(false)
}

/// True for ad detail pages: `/v-` path segment or a trailing numeric id.
pub fn is_listing_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(u) => {
            let path = u.path();
            path.contains("/v-") || LISTING_ID_RE.is_match(path)
        }
        Err(_) => false,
    }
}

/// Sets the `page` query parameter, overwriting an existing one and
/// preserving the rest of the query string.
pub fn with_page(url: &str, page: u32) -> String {
    if PAGE_PARAM_RE.is_match(url) {
        return PAGE_PARAM_RE
            .replace(url, |caps: &regex::Captures| format!("{}{}", &caps[1], page))
            .into_owned();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", url, sep, page)
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = document.select(&sel).next()?;
    clean_text(&el.text().collect::<String>())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()?
        .value()
        .attr(attr)
        .and_then(clean_text)
}

/// Keeps digits and a leading `+` only; fewer than 7 digits counts as
/// not-found.
pub(crate) fn extract_digits(v: &str) -> Option<String> {
    let mut out = String::new();
    for c in v.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' && out.is_empty() {
            out.push(c);
        }
    }
    let digits = out.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= 7 {
        Some(out)
    } else {
        None
    }
}

/// Fallback chain for the phone field, tried in order once the primary
/// selector came up empty. Each source is scanned with the phone pattern:
/// description region, phone data-attributes, `tel:` anchor href, `tel:`
/// anchor text, then whole-document text. The JSON-LD telephone field is
/// the last resort.
fn locate_phone(document: &Html) -> Option<String> {
    let candidates = [
        select_text(document, SEL_DESCRIPTION),
        select_text(document, "*[data-phone], *[data-testid*='phone']"),
        select_attr(document, "a[href^='tel']", "href"),
        select_text(document, "a[href^='tel']"),
        select_text(document, "body"),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Some(m) = CA_PHONE_RE.find(&candidate) {
            return Some(m.as_str().to_string());
        }
    }

    phone_from_json_ld(document)
}

fn phone_from_json_ld(document: &Html) -> Option<String> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    let blob = document
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    TELEPHONE_JSON_RE
        .captures(&blob)
        .map(|caps| caps[1].to_string())
}

/// Extracts a listing record from already-fetched markup. Selector misses
/// yield None per field; the caller is responsible for the domain gate.
pub fn scrape_listing_from_html(url: &str, html: &str) -> KijijiScrapeResult {
    let document = Html::parse_document(html);

    let mut phone = select_text(&document, SEL_PHONE);
    let model = select_text(&document, SEL_MODEL);
    let price = select_text(&document, SEL_PRICE);
    let address = select_text(&document, SEL_ADDRESS);

    if phone.is_none() {
        phone = locate_phone(&document);
    }

    KijijiScrapeResult {
        url: url.to_string(),
        phone: phone.as_deref().and_then(extract_digits),
        model,
        price,
        address,
    }
}

/// Finds candidate listing links on a search-results page: href must carry a
/// `/v-` marker segment and end in a 7+ digit ad id. Resolved against the
/// page URL and deduplicated; hrefs that cannot be resolved are dropped.
pub fn extract_listing_links(search_html: &str, base_url: &str) -> HashSet<String> {
    let document = Html::parse_document(search_html);
    let link_sel = Selector::parse("a[href]").unwrap();

    let mut links = HashSet::new();
    for el in document.select(&link_sel) {
        let href = el.value().attr("href").unwrap_or("");
        if !href.contains("/v-") || !LISTING_ID_RE.is_match(href) {
            continue;
        }
        if let Ok(resolved) = Url::parse(base_url).and_then(|b| b.join(href)) {
            links.insert(resolved.to_string());
        }
    }
    links
}

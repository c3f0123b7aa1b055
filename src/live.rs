use anyhow::Result;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::time::Duration;
use tokio::time::sleep;

use crate::kijiji::{extract_digits, scrape_listing_from_html, KijijiScrapeResult, CA_PHONE_RE};

const LIVE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118 Safari/537.36";

/// Clicks every control that looks like a phone reveal, returns the count.
const REVEAL_SCRIPT: &str = r#"
    (() => {
        let clicked = 0;
        const controls = document.querySelectorAll("button, [role='button']");
        for (const el of controls) {
            const text = (el.textContent || "").toLowerCase();
            const testId = (el.getAttribute("data-testid") || "").toLowerCase();
            if (text.includes("phone") || text.includes("number") || testId.includes("phone")) {
                el.click();
                clicked++;
            }
        }
        return clicked;
    })();
"#;

const TEL_HREF_SCRIPT: &str = r#"
    (() => {
        const a = document.querySelector("a[href^='tel']");
        return a ? (a.getAttribute("href") || "") : "";
    })();
"#;

/// Scrapes a listing through a real rendering pass: navigate, click the
/// phone-reveal controls, read the revealed number, then run the same
/// static extractor over the rendered markup. The caller falls back to a
/// plain fetch+parse when this path errors.
pub async fn scrape_listing_live(url: &str) -> Result<KijijiScrapeResult> {
    println!("🌐 Live scraping {}", url);

    let ua_arg = format!("--user-agent={}", LIVE_USER_AGENT);
    let args = vec![
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--no-sandbox"),
        OsStr::new("--disable-dev-shm-usage"),
        OsStr::new(&ua_arg),
    ];

    let browser = Browser::new(LaunchOptions {
        headless: true,
        window_size: Some((1920, 1080)),
        args,
        ..Default::default()
    })?;

    let tab = browser.new_tab()?;
    tab.navigate_to(url)?;
    match tab.wait_for_element_with_custom_timeout("body", Duration::from_secs(30)) {
        Ok(_) => {}
        Err(e) => println!("⚠️ Body wait timed out: {}. Attempting extraction anyway...", e),
    }

    // Let client-side rendering settle before poking at the page.
    sleep(Duration::from_secs(2)).await;

    let clicked = tab
        .evaluate(REVEAL_SCRIPT, false)?
        .value
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    if clicked > 0 {
        println!("📞 Clicked {} reveal control(s)", clicked);
        sleep(Duration::from_millis(800)).await;
    }

    let mut phone = tab
        .evaluate(TEL_HREF_SCRIPT, false)?
        .value
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|s| !s.is_empty());

    if phone.is_none() {
        let body_text = tab
            .evaluate("document.body.innerText", false)?
            .value
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default();
        phone = CA_PHONE_RE.find(&body_text).map(|m| m.as_str().to_string());
    }

    let html = tab.get_content()?;
    let mut result = scrape_listing_from_html(url, &html);

    // The revealed number wins only when it normalizes to a real phone.
    if let Some(p) = phone.as_deref().and_then(extract_digits) {
        result.phone = Some(p);
    }

    Ok(result)
}

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Identifying user agent sent on every outbound request.
pub const USER_AGENT: &str = "FusionBrowserBot/1.0";

/// Deadline for a single page fetch. Exceeding it aborts the connection.
pub const SINGLE_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

static HTTP_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// Accepts absolute http(s) URLs only.
pub fn is_http_url(url: &str) -> bool {
    HTTP_URL_RE.is_match(url)
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Valid http(s) URL required")]
    InvalidUrl,
    #[error("Fetch failed with status {0}")]
    UpstreamStatus(u16),
    #[error("Fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(String),
}

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Fetches a URL and returns the raw markup. Non-2xx statuses are surfaced
/// as `UpstreamStatus`; the caller decides whether that is terminal.
pub async fn fetch_html(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    if !is_http_url(url) {
        return Err(FetchError::InvalidUrl);
    }

    let response = client
        .get(url)
        .timeout(timeout)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| classify(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::UpstreamStatus(status.as_u16()));
    }

    response.text().await.map_err(|e| classify(e, timeout))
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn accepts_http_and_https_only() {
        assert!(is_http_url("https://example.com"));
        assert!(is_http_url("http://example.com/a?b=c"));
        assert!(is_http_url("HTTPS://EXAMPLE.COM"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
        assert!(!is_http_url("not a url"));
    }

    #[tokio::test]
    async fn fetches_page_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><title>hi</title></html>"))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let html = fetch_html(&client, &format!("{}/page", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(html.contains("<title>hi</title>"));
    }

    #[tokio::test]
    async fn non_2xx_becomes_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let err = fetch_html(&client, &server.uri(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UpstreamStatus(404)));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let err = fetch_html(&client, &server.uri(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn rejects_non_http_schemes_before_sending() {
        let client = build_http_client().unwrap();
        let err = fetch_html(&client, "file:///etc/passwd", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl));
    }
}

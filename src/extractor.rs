use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Headings are capped at the first 20 in document order.
pub const MAX_HEADINGS: usize = 20;
/// Links are capped at the first 100 in document order.
pub const MAX_LINKS: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct ScrapeLink {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct ScrapeResponse {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub headings: Vec<String>,
    pub links: Vec<ScrapeLink>,
}

/// Collapses whitespace runs to single spaces, trims, and maps empty to None.
pub fn clean_text(v: &str) -> Option<String> {
    let s = v.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Resolves a href against the page URL. Hrefs that cannot be resolved pass
/// through unchanged rather than failing the extraction.
pub fn to_absolute(href: &str, base: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Generic page extraction: title, description, headings, links.
/// Missing elements yield None/empty fields, never an error.
pub fn extract_page(url: &str, html: &str) -> ScrapeResponse {
    let document = Html::parse_document(html);

    let og_title_sel = Selector::parse("meta[property='og:title']").unwrap();
    let title_sel = Selector::parse("title").unwrap();
    let desc_sel = Selector::parse("meta[name='description']").unwrap();
    let og_desc_sel = Selector::parse("meta[property='og:description']").unwrap();
    let heading_sel = Selector::parse("h1, h2, h3").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let title = document
        .select(&og_title_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(clean_text)
        .or_else(|| {
            document
                .select(&title_sel)
                .next()
                .and_then(|el| clean_text(&el.text().collect::<String>()))
        });

    let description = document
        .select(&desc_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .and_then(clean_text)
        .or_else(|| {
            document
                .select(&og_desc_sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .and_then(clean_text)
        });

    let headings: Vec<String> = document
        .select(&heading_sel)
        .take(MAX_HEADINGS)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    let links: Vec<ScrapeLink> = document
        .select(&link_sel)
        .take(MAX_LINKS)
        .map(|el| {
            let href = el.value().attr("href").unwrap_or("");
            ScrapeLink {
                text: clean_text(&el.text().collect::<String>()).unwrap_or_default(),
                href: to_absolute(href, url),
            }
        })
        .collect();

    ScrapeResponse {
        url: url.to_string(),
        title,
        description,
        headings,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/articles/1";

    #[test]
    fn cleans_whitespace_runs() {
        assert_eq!(clean_text("  a\n\t b  "), Some("a b".to_string()));
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text(""), None);
    }

    #[test]
    fn prefers_og_title_over_document_title() {
        let html = r#"<html><head>
            <meta property='og:title' content='OG Title'>
            <title>Doc Title</title>
        </head></html>"#;
        let result = extract_page(BASE, html);
        assert_eq!(result.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn empty_og_title_falls_back_to_document_title() {
        let html = r#"<html><head>
            <meta property='og:title' content='   '>
            <title>  Doc   Title </title>
        </head></html>"#;
        let result = extract_page(BASE, html);
        assert_eq!(result.title.as_deref(), Some("Doc Title"));
    }

    #[test]
    fn meta_description_wins_over_og_description() {
        let html = r#"<html><head>
            <meta name='description' content='plain description'>
            <meta property='og:description' content='og description'>
        </head></html>"#;
        let result = extract_page(BASE, html);
        assert_eq!(result.description.as_deref(), Some("plain description"));

        let og_only = r#"<html><head>
            <meta property='og:description' content='og description'>
        </head></html>"#;
        let result = extract_page(BASE, og_only);
        assert_eq!(result.description.as_deref(), Some("og description"));
    }

    #[test]
    fn missing_metadata_yields_none_not_errors() {
        let result = extract_page(BASE, "<html><body><p>nothing here</p></body></html>");
        assert_eq!(result.title, None);
        assert_eq!(result.description, None);
        assert!(result.headings.is_empty());
        assert!(result.links.is_empty());
    }

    #[test]
    fn survives_malformed_markup() {
        let result = extract_page(BASE, "<div><h1>Broken<h2>Still broken</div></span>");
        assert_eq!(result.headings.len(), 2);
    }

    #[test]
    fn caps_headings_at_twenty() {
        let mut html = String::from("<html><body>");
        for i in 0..25 {
            html.push_str(&format!("<h2>Heading {}</h2>", i));
        }
        html.push_str("</body></html>");
        let result = extract_page(BASE, &html);
        assert_eq!(result.headings.len(), MAX_HEADINGS);
        assert_eq!(result.headings[0], "Heading 0");
        assert_eq!(result.headings[19], "Heading 19");
    }

    #[test]
    fn caps_links_at_one_hundred() {
        let mut html = String::from("<html><body>");
        for i in 0..120 {
            html.push_str(&format!("<a href='/p/{}'>link {}</a>", i, i));
        }
        html.push_str("</body></html>");
        let result = extract_page(BASE, &html);
        assert_eq!(result.links.len(), MAX_LINKS);
    }

    #[test]
    fn resolves_relative_hrefs_against_page_url() {
        let html = r#"<html><body>
            <a href="/about">  About
                us </a>
            <a href="contact">Contact</a>
            <a href="https://other.example.org/x">Other</a>
        </body></html>"#;
        let result = extract_page(BASE, html);
        assert_eq!(result.links[0].href, "https://example.com/about");
        assert_eq!(result.links[0].text, "About us");
        assert_eq!(result.links[1].href, "https://example.com/articles/contact");
        assert_eq!(result.links[2].href, "https://other.example.org/x");
    }

    #[test]
    fn unresolvable_href_passes_through() {
        let html = r#"<a href="http://[bad">broken</a>"#;
        let result = extract_page(BASE, html);
        assert_eq!(result.links[0].href, "http://[bad");
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = r#"<html><head><title>T</title></head><body>
            <h1>A</h1><h2>B</h2>
            <a href="/1">one</a><a href="/2">two</a>
        </body></html>"#;
        let a = extract_page(BASE, html);
        let b = extract_page(BASE, html);
        assert_eq!(a.headings, b.headings);
        assert_eq!(
            a.links.iter().map(|l| &l.href).collect::<Vec<_>>(),
            b.links.iter().map(|l| &l.href).collect::<Vec<_>>()
        );
    }
}

//! Default [`CrawlEngine`] backed by plain HTTP fetches.
//!
//! This engine performs static GETs only; it does not execute scripts or
//! render pages. HTML bodies get a light structural markdown rendition
//! (headings, paragraphs, list items, code blocks) plus same-host link
//! extraction; plain-text bodies pass through untouched. Richer engines
//! plug in behind the [`CrawlEngine`] trait.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{CrawlEngine, PageCapture};
use crate::types::RagError;

const USER_AGENT: &str = concat!("crawlsmith/", env!("CARGO_PKG_VERSION"));

pub struct HttpCrawlEngine {
    client: reqwest::Client,
}

impl HttpCrawlEngine {
    pub fn new() -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()
            .map_err(|err| RagError::Fetch(err.to_string()))?;
        Ok(Self { client })
    }

    /// Uses a preconfigured client (custom timeouts, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CrawlEngine for HttpCrawlEngine {
    async fn fetch(&self, url: &str) -> Result<PageCapture, RagError> {
        let parsed =
            Url::parse(url).map_err(|err| RagError::Validation(format!("invalid URL {url}: {err}")))?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|err| RagError::Fetch(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(PageCapture::failure(url, format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|err| RagError::Fetch(err.to_string()))?;

        let is_html =
            content_type.contains("text/html") || body.trim_start().starts_with('<');

        if is_html {
            let markdown = render_markdown(&body)?;
            let internal_links = extract_internal_links(&body, &parsed)?;
            Ok(PageCapture::page(url, markdown, internal_links))
        } else {
            Ok(PageCapture::page(url, body, Vec::new()))
        }
    }
}

/// Flattens HTML structure into markdown-ish text.
fn render_markdown(html: &str) -> Result<String, RagError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("h1, h2, h3, h4, h5, h6, p, li, pre")
        .map_err(|err| RagError::Fetch(err.to_string()))?;

    let mut blocks = Vec::new();
    for element in document.select(&selector) {
        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        let block = match element.value().name() {
            "h1" => format!("# {text}"),
            "h2" => format!("## {text}"),
            "h3" => format!("### {text}"),
            "h4" => format!("#### {text}"),
            "h5" => format!("##### {text}"),
            "h6" => format!("###### {text}"),
            "li" => format!("- {text}"),
            "pre" => format!("```\n{text}\n```"),
            _ => text,
        };
        blocks.push(block);
    }

    Ok(blocks.join("\n\n"))
}

/// Absolute same-host links from `<a href>` elements, fragments stripped.
fn extract_internal_links(html: &str, base: &Url) -> Result<Vec<String>, RagError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse("a[href]").map_err(|err| RagError::Fetch(err.to_string()))?;

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str() != base.host_str() {
            continue;
        }
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    Ok(links)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_paragraphs_and_code() {
        let html = r#"<html><body>
            <h1>Title</h1>
            <p>First paragraph.</p>
            <pre>let x = 1;</pre>
            <ul><li>item one</li><li>item two</li></ul>
        </body></html>"#;

        let markdown = render_markdown(html).unwrap();

        assert!(markdown.contains("# Title"));
        assert!(markdown.contains("First paragraph."));
        assert!(markdown.contains("```\nlet x = 1;\n```"));
        assert!(markdown.contains("- item one"));
    }

    #[test]
    fn internal_links_stay_on_host_and_lose_fragments() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        let html = r##"<html><body>
            <a href="/docs/intro">intro</a>
            <a href="chapter-2.html#top">chapter</a>
            <a href="https://other.com/page">external</a>
            <a href="mailto:team@example.com">mail</a>
            <a href="#section">anchor</a>
            <a href="/docs/intro">duplicate</a>
        </body></html>"##;

        let links = extract_internal_links(html, &base).unwrap();

        assert_eq!(
            links,
            vec![
                "https://example.com/docs/intro".to_string(),
                "https://example.com/docs/chapter-2.html".to_string(),
            ]
        );
    }
}

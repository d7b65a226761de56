//! HTTP collaborator tests against a local mock server.
//!
//! Covers the crawl engine, sitemap reader, and OpenAI-compatible embedding
//! provider without touching the real network.

use httpmock::prelude::*;
use serde_json::json;

use crawlsmith::crawl::{CrawlEngine, HttpCrawlEngine};
use crawlsmith::embeddings::{EmbeddingProvider, OpenAiEmbeddingProvider};
use crawlsmith::sitemap::{HttpSitemapReader, SitemapReader};
use crawlsmith::types::RagError;

#[tokio::test]
async fn crawl_engine_renders_html_and_collects_internal_links() {
    let server = MockServer::start_async().await;
    let page = server.mock(|when, then| {
        when.method(GET).path("/docs");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(
                r#"<html><body>
                    <h1>Docs</h1>
                    <p>Welcome to the docs.</p>
                    <a href="/docs/intro">intro</a>
                    <a href="https://elsewhere.com/page">external</a>
                </body></html>"#,
            );
    });

    let engine = HttpCrawlEngine::new().unwrap();
    let capture = engine.fetch(&server.url("/docs")).await.unwrap();

    page.assert();
    assert!(capture.success);
    assert!(capture.markdown.contains("# Docs"));
    assert!(capture.markdown.contains("Welcome to the docs."));
    assert_eq!(capture.internal_links, vec![server.url("/docs/intro")]);
}

#[tokio::test]
async fn crawl_engine_passes_plain_text_through() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/llms.txt");
        then.status(200)
            .header("content-type", "text/plain")
            .body("Line one.\nLine two.");
    });

    let engine = HttpCrawlEngine::new().unwrap();
    let capture = engine.fetch(&server.url("/llms.txt")).await.unwrap();

    assert!(capture.success);
    assert_eq!(capture.markdown, "Line one.\nLine two.");
    assert!(capture.internal_links.is_empty());
}

#[tokio::test]
async fn crawl_engine_turns_http_errors_into_failed_captures() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404);
    });

    let engine = HttpCrawlEngine::new().unwrap();
    let capture = engine.fetch(&server.url("/gone")).await.unwrap();

    assert!(!capture.success);
    assert!(capture.error.unwrap().contains("404"));
}

#[tokio::test]
async fn sitemap_reader_extracts_page_urls() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/sitemap.xml");
        then.status(200).header("content-type", "application/xml").body(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>https://example.com/page1</loc></url>
                <url><loc>https://example.com/page2</loc></url>
            </urlset>"#,
        );
    });

    let reader = HttpSitemapReader::new().unwrap();
    let urls = reader.page_urls(&server.url("/sitemap.xml")).await;

    assert_eq!(
        urls,
        vec![
            "https://example.com/page1".to_string(),
            "https://example.com/page2".to_string(),
        ]
    );
}

#[tokio::test]
async fn sitemap_reader_returns_empty_on_http_error() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/sitemap.xml");
        then.status(500);
    });

    let reader = HttpSitemapReader::new().unwrap();
    assert!(reader.page_urls(&server.url("/sitemap.xml")).await.is_empty());
}

#[tokio::test]
async fn sitemap_reader_returns_empty_on_invalid_xml() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/sitemap.xml");
        then.status(200).body("not a sitemap at all");
    });

    let reader = HttpSitemapReader::new().unwrap();
    assert!(reader.page_urls(&server.url("/sitemap.xml")).await.is_empty());
}

#[tokio::test]
async fn openai_provider_restores_input_order_from_indices() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/embeddings")
            .header("authorization", "Bearer test-key")
            .json_body_partial(r#"{"model": "text-embedding-3-small"}"#);
        then.status(200).json_body(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]},
            ],
            "model": "text-embedding-3-small",
        }));
    });

    let provider = OpenAiEmbeddingProvider::new(
        "test-key",
        &server.url("/v1"),
        "text-embedding-3-small",
        2,
    )
    .unwrap();
    let texts = vec!["first".to_string(), "second".to_string()];
    let vectors = provider.embed(&texts).await.unwrap();

    mock.assert();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn openai_provider_surfaces_error_statuses() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(429).body("rate limited");
    });

    let provider = OpenAiEmbeddingProvider::new(
        "test-key",
        &server.url("/v1"),
        "text-embedding-3-small",
        2,
    )
    .unwrap();
    let result = provider.embed(&["text".to_string()]).await;

    match result {
        Err(RagError::Provider(message)) => {
            assert!(message.contains("429"));
            assert!(message.contains("rate limited"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[test]
fn openai_provider_rejects_empty_api_keys() {
    let result =
        OpenAiEmbeddingProvider::new("  ", "https://api.openai.com/v1", "model", 1536);
    assert!(matches!(result, Err(RagError::Validation(_))));
}

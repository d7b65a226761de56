//! URL classification for routing crawl strategies.
//!
//! Classification is pure string inspection: no network access, and no input
//! is ever rejected. Strings that do not parse as URLs are classified on the
//! raw text so the decision stays total.

use url::Url;

/// How a URL should be crawled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// The path mentions a sitemap; fetch and expand it into a URL list.
    Sitemap,
    /// A plain-text document (e.g. `llms.txt`); fetch it as-is.
    TextFile,
    /// An ordinary page; crawl it recursively via internal links.
    Webpage,
}

impl UrlKind {
    /// Stable label used in crawl reports.
    pub fn label(self) -> &'static str {
        match self {
            UrlKind::Sitemap => "sitemap",
            UrlKind::TextFile => "text_file",
            UrlKind::Webpage => "webpage",
        }
    }
}

/// Classifies a URL by its path.
///
/// A path containing the substring `sitemap` (case-sensitive, any extension)
/// is a [`UrlKind::Sitemap`]; a path ending in `.txt` is a
/// [`UrlKind::TextFile`]; everything else is a [`UrlKind::Webpage`].
pub fn classify(raw: &str) -> UrlKind {
    let path = match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw.to_string(),
    };

    if path.contains("sitemap") {
        UrlKind::Sitemap
    } else if path.ends_with(".txt") {
        UrlKind::TextFile
    } else {
        UrlKind::Webpage
    }
}

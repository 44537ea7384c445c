//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` trait that abstracts over the browser engine
//! (currently Chromium via chromiumoxide). The pipeline only ever talks to
//! the trait, which is what the integration tests mock.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};

/// Result of fully rendering one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after any redirects.
    pub final_url: String,
    /// Post-JavaScript document HTML.
    pub html: String,
    /// Stylesheet URLs: CDP-observed `text/css` responses merged with
    /// `<link rel="stylesheet">` hrefs from the final HTML, deduplicated.
    pub css_urls: Vec<String>,
    /// Full-page PNG screenshot as a base64 data URL.
    pub screenshot: Option<String>,
    /// Time from navigation start to settled page, in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can render pages.
///
/// One instance owns one browser process; `render` may be called repeatedly
/// until `close` releases the browser. Implementations hold their resources
/// explicitly — no module-level singletons.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to a URL, wait for the network to settle, and return the
    /// rendered result. Timeouts and navigation errors are page-level
    /// failures for the caller to absorb.
    async fn render(&self, url: &str) -> Result<RenderedPage>;

    /// Release the browser. Must be safe to call after a failed `render`.
    async fn close(&self) -> Result<()>;
}

/// A renderer for environments without a browser. Every `render` fails,
/// which the pipeline records as a page-level failure.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage> {
        Err(anyhow::anyhow!("browser not available"))
    }
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Extract `<link rel="stylesheet">` hrefs from rendered HTML, resolved
/// against the page URL.
pub fn stylesheet_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(r#"link[rel="stylesheet"]"#).unwrap();
    let base = url::Url::parse(base_url).ok();

    let mut out = Vec::new();
    for element in document.select(&sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(b) => b
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };
        if !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out
}

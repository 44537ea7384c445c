//! Chromium-based renderer using chromiumoxide.
//!
//! One headless browser per renderer instance, launched by `launch()` and
//! released by `close()`. Per render: request interception aborts known
//! tracker loads, Network events collect stylesheet URLs, navigation waits
//! for the network to settle under a bounded timeout, and a full-page PNG
//! screenshot is captured.

use super::{stylesheet_links, RenderedPage, Renderer};
use crate::error::IngestError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, ErrorReason, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default bound on one navigation, including the settle wait.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 45_000;

/// Third-party tracking/analytics hosts whose subresource loads get aborted.
/// Blocking is further restricted by resource type so a page's own assets
/// are never touched.
const TRACKER_HOSTS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "doubleclick.net",
    "connect.facebook.net",
    "facebook.com/tr",
    "hotjar.com",
    "mixpanel.com",
    "segment.com",
    "segment.io",
    "clarity.ms",
    "fullstory.com",
    "intercom.io",
    "amplitude.com",
    "heapanalytics.com",
];

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. MORAY_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("MORAY_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.moray/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".moray/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".moray/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".moray/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".moray/chromium/chrome-linux64/chrome"),
                home.join(".moray/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

struct BrowserHandle {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

/// Chromium-based renderer. Holds the browser explicitly for the lifetime of
/// one ingestion run.
pub struct ChromiumRenderer {
    handle: tokio::sync::Mutex<Option<BrowserHandle>>,
    nav_timeout: Duration,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch(nav_timeout_ms: u64) -> Result<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            IngestError::BrowserUnavailable(
                "Chromium not found. Set MORAY_CHROMIUM_PATH or install google-chrome/chromium."
                    .to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            handle: tokio::sync::Mutex::new(Some(BrowserHandle {
                browser,
                handler_task,
            })),
            nav_timeout: Duration::from_millis(nav_timeout_ms),
        })
    }

    async fn render_on(&self, page: &Page, url: &str) -> Result<RenderedPage> {
        let start = Instant::now();

        // Stylesheet URLs observed on the wire, shared with the collector task.
        let css_seen: Arc<Mutex<BTreeSet<String>>> = Arc::new(Mutex::new(BTreeSet::new()));

        page.execute(NetworkEnableParams::default())
            .await
            .context("failed to enable Network domain")?;
        page.execute(FetchEnableParams::default())
            .await
            .context("failed to enable Fetch domain")?;

        // Abort tracker loads, pass everything else through.
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .context("failed to listen for paused requests")?;
        let intercept_page = page.clone();
        let intercept_task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let request_id = event.request_id.clone();
                let blocked = should_block(&event.request.url, &event.resource_type);
                let result = if blocked {
                    debug!("blocking tracker load {}", event.request.url);
                    intercept_page
                        .execute(FailRequestParams::new(
                            request_id,
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ())
                } else {
                    intercept_page
                        .execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = result {
                    debug!("request interception reply failed: {e}");
                }
            }
        });

        // Record every text/css response.
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to listen for responses")?;
        let css_sink = Arc::clone(&css_seen);
        let css_task = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.response.mime_type.to_lowercase().contains("text/css") {
                    if let Ok(mut set) = css_sink.lock() {
                        set.insert(event.response.url.clone());
                    }
                }
            }
        });

        let nav = tokio::time::timeout(self.nav_timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            // Give late XHR-driven mutations a moment to settle.
            tokio::time::sleep(Duration::from_millis(500)).await;
            anyhow::Ok(())
        })
        .await;

        let nav_outcome = match nav {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(IngestError::Navigation(format!("{e}"))),
            Err(_) => Err(IngestError::Navigation(format!(
                "timed out after {}ms",
                self.nav_timeout.as_millis()
            ))),
        };
        if let Err(e) = nav_outcome {
            intercept_task.abort();
            css_task.abort();
            bail!(e);
        }

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        let html: String = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to read rendered HTML")?
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        let screenshot = match page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
        {
            Ok(png) => Some(format!("data:image/png;base64,{}", BASE64.encode(png))),
            Err(e) => {
                warn!("screenshot failed for {url}: {e}");
                None
            }
        };

        intercept_task.abort();
        css_task.abort();

        // Merge wire-observed CSS with static <link> parsing of the final HTML.
        let mut css_urls: Vec<String> = css_seen
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        for link in stylesheet_links(&html, &final_url) {
            if !css_urls.contains(&link) {
                css_urls.push(link);
            }
        }

        Ok(RenderedPage {
            final_url,
            html,
            css_urls,
            screenshot,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let guard = self.handle.lock().await;
        let handle = guard
            .as_ref()
            .context("renderer already closed")?;

        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create page")?;

        let result = self.render_on(&page, url).await;
        if let Err(e) = page.close().await {
            debug!("page close failed: {e}");
        }
        result
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.handle.lock().await;
        if let Some(mut handle) = guard.take() {
            if let Err(e) = handle.browser.close().await {
                debug!("browser close failed: {e}");
            }
            handle.handler_task.abort();
        }
        Ok(())
    }
}

/// Whether a request should be aborted: tracker host AND a blockable
/// resource type. Documents and XHR always pass so the page itself loads.
fn should_block(url: &str, resource_type: &ResourceType) -> bool {
    let type_blockable = matches!(
        resource_type,
        ResourceType::Image
            | ResourceType::Media
            | ResourceType::Font
            | ResourceType::Stylesheet
            | ResourceType::Script
    );
    if !type_blockable {
        return false;
    }
    let url = url.to_lowercase();
    TRACKER_HOSTS.iter().any(|host| url.contains(host))
}

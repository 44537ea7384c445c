//! Plain HTTP fetching for robots.txt, sitemaps, stylesheets, and the crawl
//! fallback. Not a browser — no JS execution. Handles redirects, timeouts,
//! retry on 5xx, and backoff on 429.

use anyhow::Result;
use std::time::Duration;

/// User agent sent with every plain HTTP request. The trailing token is what
/// robots.txt group matching keys on.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; moray/0.3; +https://github.com/moray-labs/moray)";

/// Response from a GET request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the discovery and style-mining stages.
#[derive(Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback for sites that reject HTTP/2.
    h1_client: reqwest::Client,
    timeout: Duration,
}

impl FetchClient {
    pub fn new(timeout_ms: u64) -> Self {
        let timeout = Duration::from_millis(timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        let h1_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .http1_only()
            .build()
            .unwrap_or_default();
        Self {
            client,
            h1_client,
            timeout,
        }
    }

    /// GET with retry on 5xx, backoff on 429, and an HTTP/1.1 retry when the
    /// error looks like a protocol problem (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str) -> Result<FetchResponse> {
        match self.get_inner(&self.client, url).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                let err_str = format!("{e}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    self.get_inner(&self.h1_client, url).await
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Fetch a URL's body as text, treating any failure or non-2xx status as
    /// "no content". This is the shape most discovery callers want.
    pub async fn get_text(&self, url: &str) -> Option<String> {
        match self.get(url).await {
            Ok(resp) if resp.is_ok() => Some(resp.body),
            Ok(resp) => {
                tracing::debug!("GET {url} returned {}", resp.status);
                None
            }
            Err(e) => {
                tracing::debug!("GET {url} failed: {e}");
                None
            }
        }
    }

    async fn get_inner(&self, client: &reqwest::Client, url: &str) -> Result<FetchResponse> {
        let mut retries = 0u32;
        let max_retries = 2;

        loop {
            let resp = client.get(url).timeout(self.timeout).send().await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();
                    let final_url = r.url().to_string();

                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if status == 429 && retries < max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    let content_type = r
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());
                    let body = r.text().await.unwrap_or_default();

                    return Ok(FetchResponse {
                        url: url.to_string(),
                        final_url,
                        status,
                        content_type,
                        body,
                    });
                }
                Err(e) => {
                    if retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

//! URL discovery: robots.txt → sitemap chain, with a bounded same-origin
//! crawl as the fallback when no sitemap yields anything.

pub mod crawler;
pub mod robots;
pub mod sitemap;

use crate::fetch::FetchClient;
use crate::model::SiteMapNode;
use robots::RobotsRules;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Token matched against robots.txt `User-agent` groups.
pub const ROBOTS_UA_TOKEN: &str = "moray";

/// Outcome of URL discovery for one site.
#[derive(Debug, Default)]
pub struct UrlDiscovery {
    /// Candidate page URLs, deduplicated, in discovery order.
    pub urls: Vec<String>,
    /// Sitemap XML URLs that were actually consulted.
    pub sitemap_urls: Vec<String>,
    /// Raw robots.txt body, if one was fetched.
    pub robots_txt: Option<String>,
    pub robots: RobotsRules,
    /// Whether the crawl fallback was exercised.
    pub used_crawl_fallback: bool,
}

/// Discover candidate page URLs for `target_url`.
///
/// 1. robots.txt `Sitemap:` directives, plus the conventional
///    `{origin}/sitemap.xml`.
/// 2. Each sitemap parsed as urlset or sitemap index; index `<loc>`s are
///    taken as one-level candidates without recursive fetching.
/// 3. Empty union → breadth-first same-origin crawl bounded by `max_pages`.
///
/// Any individual fetch or parse failure is treated as "no content".
pub async fn discover_urls(
    client: &FetchClient,
    target_url: &str,
    max_pages: usize,
) -> UrlDiscovery {
    let mut discovery = UrlDiscovery::default();
    let Some(origin) = to_origin(target_url) else {
        return discovery;
    };

    // robots.txt
    let robots_url = format!("{origin}/robots.txt");
    if let Some(body) = client.get_text(&robots_url).await {
        discovery.robots = RobotsRules::parse(&body, ROBOTS_UA_TOKEN);
        discovery.robots_txt = Some(body);
    }

    // Sitemap candidates: robots directives first, conventional path appended.
    let mut sitemap_candidates = discovery.robots.sitemaps.clone();
    let conventional = format!("{origin}/sitemap.xml");
    if !sitemap_candidates.contains(&conventional) {
        sitemap_candidates.push(conventional);
    }

    let mut urls: Vec<String> = Vec::new();
    for sm_url in &sitemap_candidates {
        let Some(xml) = client.get_text(sm_url).await else {
            continue;
        };
        match sitemap::parse_sitemap(&xml) {
            Ok(doc) => {
                discovery.sitemap_urls.push(sm_url.clone());
                for entry in doc.pages {
                    push_unique(&mut urls, entry.url);
                }
                for nested in doc.nested {
                    push_unique(&mut urls, nested);
                }
            }
            Err(e) => {
                debug!("sitemap {sm_url} failed to parse: {e}");
            }
        }
    }

    if urls.is_empty() {
        info!("no sitemap URLs for {origin}, falling back to crawl");
        discovery.used_crawl_fallback = true;
        urls = crawler::crawl(client, target_url, max_pages, &discovery.robots).await;
    }

    if !urls.iter().any(|u| u == target_url) {
        urls.insert(0, target_url.to_string());
    }
    discovery.urls = urls;
    discovery
}

/// Build the URL tree shown in the dashboard: one child per first path
/// segment, grandchildren per second segment.
pub fn build_site_tree(origin_url: &str, urls: &[String]) -> Vec<SiteMapNode> {
    let mut groups: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for u in urls {
        let Ok(parsed) = url::Url::parse(u) else {
            continue;
        };
        let segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.first() {
            None => continue, // the origin itself — represented by the root
            Some(first) => {
                let rest = segments.get(1).unwrap_or(&"").to_string();
                groups
                    .entry(first.to_string())
                    .or_default()
                    .push((u.clone(), rest));
            }
        }
    }

    let children = groups
        .into_iter()
        .map(|(segment, members)| {
            let node_url = members
                .iter()
                .find(|(_, rest)| rest.is_empty())
                .map(|(u, _)| u.clone())
                .unwrap_or_else(|| members[0].0.clone());
            let grandchildren = members
                .iter()
                .filter(|(_, rest)| !rest.is_empty())
                .map(|(u, rest)| SiteMapNode {
                    url: u.clone(),
                    title: Some(humanize_segment(rest)),
                    children: Vec::new(),
                })
                .collect();
            SiteMapNode {
                url: node_url,
                title: Some(humanize_segment(&segment)),
                children: grandchildren,
            }
        })
        .collect();

    vec![SiteMapNode {
        url: origin_url.to_string(),
        title: Some("Home".to_string()),
        children,
    }]
}

/// Scheme + host (+ non-default port) of a URL, without trailing slash.
pub fn to_origin(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let mut origin = format!("{}://{host}", parsed.scheme());
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{port}"));
    }
    Some(origin)
}

/// Resolve `href` against `base`, keeping only http(s) links and stripping
/// fragments. Returns None for mailto:, tel:, javascript: and friends.
pub fn normalize_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }
    let base = url::Url::parse(base).ok()?;
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn push_unique(urls: &mut Vec<String>, url: String) {
    if !urls.contains(&url) {
        urls.push(url);
    }
}

fn humanize_segment(segment: &str) -> String {
    segment
        .trim_end_matches(".html")
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

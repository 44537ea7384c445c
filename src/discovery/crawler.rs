//! Breadth-first same-origin crawl, used only when sitemap discovery comes
//! up empty.

use super::robots::RobotsRules;
use super::{normalize_link, to_origin};
use crate::fetch::FetchClient;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Crawl same-origin pages starting at `seed`, bounded by `max_pages`.
///
/// Fetch failures are swallowed — a page that cannot be fetched still counts
/// as visited but contributes no links. Returns URLs in BFS order.
pub async fn crawl(
    client: &FetchClient,
    seed: &str,
    max_pages: usize,
    robots: &RobotsRules,
) -> Vec<String> {
    let Some(origin) = to_origin(seed) else {
        return Vec::new();
    };

    let mut visited: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    let seed = seed.trim_end_matches('#').to_string();
    queue.push_back(seed);

    while let Some(url) = queue.pop_front() {
        if order.len() >= max_pages {
            break;
        }
        if !visited.insert(url.clone()) {
            continue;
        }
        if !robots.is_allowed(&url) {
            debug!("crawl skipping {url}: disallowed by robots.txt");
            continue;
        }

        order.push(url.clone());

        let Some(body) = client.get_text(&url).await else {
            continue;
        };

        for link in crate::extraction::page::extract_links(&body, &url) {
            let Some(normalized) = normalize_link(&url, &link) else {
                continue;
            };
            if to_origin(&normalized).as_deref() != Some(origin.as_str()) {
                continue;
            }
            if !visited.contains(&normalized) {
                queue.push_back(normalized);
            }
        }
    }

    order
}

//! Per-page extraction from rendered HTML: links, visible text, image
//! assets, and SEO metadata.

use crate::model::{ImageAsset, OpenGraphMeta, SeoMeta, TwitterMeta};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

/// Extract every anchor href from the page, resolved against `base_url`.
/// Fragment-only, javascript: and empty hrefs are skipped; origin filtering
/// is the caller's concern.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("a[href]").unwrap();
    let base = url::Url::parse(base_url).ok();

    let mut links = Vec::new();
    for element in document.select(&sel) {
        let href = element.value().attr("href").unwrap_or("");
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }
        let resolved = match &base {
            Some(b) => match b.join(href) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => href.to_string(),
        };
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }
    links
}

/// Extract the visible text of a page: every text node outside
/// script/style/noscript/template/head, whitespace-collapsed.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| {
                    matches!(
                        e.name(),
                        "script" | "style" | "noscript" | "template" | "head"
                    )
                })
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collect image assets from `<img src>` and inline
/// `style="background-image: url(...)"` declarations.
pub fn extract_images(html: &str, base_url: &str) -> Vec<ImageAsset> {
    let document = Html::parse_document(html);
    let base = url::Url::parse(base_url).ok();
    let resolve = |raw: &str| -> Option<String> {
        let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"');
        if raw.is_empty() || raw.starts_with("data:") {
            return None;
        }
        match &base {
            Some(b) => b.join(raw).ok().map(|u| u.to_string()),
            None => Some(raw.to_string()),
        }
    };

    let mut assets: Vec<ImageAsset> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let img_sel = Selector::parse("img[src]").unwrap();
    for element in document.select(&img_sel) {
        let Some(url) = element.value().attr("src").and_then(|s| resolve(s)) else {
            continue;
        };
        if seen.insert(url.clone()) {
            assets.push(ImageAsset {
                url,
                alt: element
                    .value()
                    .attr("alt")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                source: "img".to_string(),
            });
        }
    }

    let bg_re = Regex::new(r#"background(?:-image)?\s*:\s*url\(\s*([^)]+)\)"#).unwrap();
    let styled_sel = Selector::parse("[style]").unwrap();
    for element in document.select(&styled_sel) {
        let style = element.value().attr("style").unwrap_or("");
        for caps in bg_re.captures_iter(style) {
            let Some(url) = resolve(&caps[1]) else {
                continue;
            };
            if seen.insert(url.clone()) {
                assets.push(ImageAsset {
                    url,
                    alt: None,
                    source: "css-background".to_string(),
                });
            }
        }
    }

    assets
}

/// Pull SEO metadata: title, description, canonical, OpenGraph, Twitter
/// Card, and the `@type`s of every JSON-LD object on the page.
pub fn extract_seo(html: &str) -> SeoMeta {
    let document = Html::parse_document(html);
    let mut seo = SeoMeta::default();

    let attr_of = |selector: &str, attr: &str| -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    if let Ok(sel) = Selector::parse("title") {
        seo.title = document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
    }
    seo.description = attr_of(r#"meta[name="description"]"#, "content");
    seo.canonical = attr_of(r#"link[rel="canonical"]"#, "href");

    let og_sel = Selector::parse(r#"meta[property^="og:"]"#).unwrap();
    let mut og = OpenGraphMeta::default();
    for element in document.select(&og_sel) {
        let property = element.value().attr("property").unwrap_or("");
        let content = element.value().attr("content").unwrap_or("").to_string();
        if content.is_empty() {
            continue;
        }
        match property {
            "og:title" => og.title = Some(content),
            "og:description" => og.description = Some(content),
            "og:image" => og.image = Some(content),
            "og:url" => og.url = Some(content),
            "og:site_name" => og.site_name = Some(content),
            "og:type" => og.og_type = Some(content),
            _ => {}
        }
    }
    seo.og = og;

    let tw_sel = Selector::parse(r#"meta[name^="twitter:"]"#).unwrap();
    let mut twitter = TwitterMeta::default();
    for element in document.select(&tw_sel) {
        let name = element.value().attr("name").unwrap_or("");
        let content = element.value().attr("content").unwrap_or("").to_string();
        if content.is_empty() {
            continue;
        }
        match name {
            "twitter:card" => twitter.card = Some(content),
            "twitter:title" => twitter.title = Some(content),
            "twitter:description" => twitter.description = Some(content),
            "twitter:image" => twitter.image = Some(content),
            _ => {}
        }
    }
    seo.twitter = twitter;

    for value in jsonld_blocks(&document) {
        collect_jsonld_types(&value, &mut seo.jsonld_types);
    }

    seo
}

/// Parse every `<script type="application/ld+json">` blob, skipping any
/// that fail to parse.
pub fn jsonld_blocks(document: &Html) -> Vec<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut blocks = Vec::new();
    for element in document.select(&sel) {
        let text = element.inner_html();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            blocks.push(value);
        }
    }
    blocks
}

fn collect_jsonld_types(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_jsonld_types(item, out);
            }
        }
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => {
                    if !out.contains(t) {
                        out.push(t.clone());
                    }
                }
                Some(Value::Array(ts)) => {
                    for t in ts.iter().filter_map(|t| t.as_str()) {
                        if !out.iter().any(|o| o == t) {
                            out.push(t.to_string());
                        }
                    }
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_jsonld_types(graph, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_resolves_relative() {
        let html = r##"
        <a href="/about">About</a>
        <a href="https://bluedivers.example/courses">Courses</a>
        <a href="#top">Top</a>
        <a href="javascript:void(0)">JS</a>
        "##;
        let links = extract_links(html, "https://bluedivers.example/");
        assert_eq!(
            links,
            vec![
                "https://bluedivers.example/about",
                "https://bluedivers.example/courses",
            ]
        );
    }

    #[test]
    fn test_extract_text_skips_scripts_and_styles() {
        let html = r#"
        <html><head><title>Ignored</title><style>.x{color:red}</style></head>
        <body><h1>Dive   with us</h1><script>var x = "hidden";</script>
        <p>Open water   courses</p></body></html>
        "#;
        let text = extract_text(html);
        assert_eq!(text, "Dive with us Open water courses");
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color:red"));
    }

    #[test]
    fn test_extract_images_from_img_and_background() {
        let html = r#"
        <img src="/photos/reef.jpg" alt="Reef" />
        <div style="background-image: url('/photos/wreck.jpg')"></div>
        <img src="data:image/gif;base64,R0lGOD" />
        <img src="/photos/reef.jpg" />
        "#;
        let images = extract_images(html, "https://bluedivers.example/");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://bluedivers.example/photos/reef.jpg");
        assert_eq!(images[0].alt.as_deref(), Some("Reef"));
        assert_eq!(images[0].source, "img");
        assert_eq!(images[1].source, "css-background");
    }

    #[test]
    fn test_extract_seo_meta() {
        let html = r#"
        <html><head>
        <title>Blue Divers — Dive Center</title>
        <meta name="description" content="PADI courses and daily boat trips" />
        <link rel="canonical" href="https://bluedivers.example/" />
        <meta property="og:site_name" content="Blue Divers" />
        <meta property="og:image" content="https://bluedivers.example/og.jpg" />
        <meta name="twitter:card" content="summary_large_image" />
        <script type="application/ld+json">
        {"@type": "LocalBusiness", "name": "Blue Divers"}
        </script>
        </head><body></body></html>
        "#;
        let seo = extract_seo(html);
        assert_eq!(seo.title.as_deref(), Some("Blue Divers — Dive Center"));
        assert_eq!(
            seo.description.as_deref(),
            Some("PADI courses and daily boat trips")
        );
        assert_eq!(seo.og.site_name.as_deref(), Some("Blue Divers"));
        assert_eq!(seo.twitter.card.as_deref(), Some("summary_large_image"));
        assert_eq!(seo.jsonld_types, vec!["LocalBusiness"]);
    }

    #[test]
    fn test_jsonld_bad_blocks_skipped() {
        let html = r#"
        <script type="application/ld+json">{broken</script>
        <script type="application/ld+json">{"@type": "Organization"}</script>
        "#;
        let document = Html::parse_document(html);
        let blocks = jsonld_blocks(&document);
        assert_eq!(blocks.len(), 1);
    }
}

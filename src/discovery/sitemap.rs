//! Parse sitemap.xml and sitemap-index files.

use anyhow::Result;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A page entry from a `<urlset>` sitemap.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub url: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub priority: Option<f32>,
}

/// Result of parsing one sitemap document.
#[derive(Debug, Clone, Default)]
pub struct SitemapDoc {
    /// Leaf page URLs from `<urlset>`.
    pub pages: Vec<SitemapEntry>,
    /// `<loc>` values of nested sitemaps from `<sitemapindex>`. These are
    /// surfaced as one-level candidates, not re-fetched recursively.
    pub nested: Vec<String>,
}

/// Parse a sitemap XML string. Handles both urlset and sitemap index.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDoc> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut doc = SitemapDoc::default();
    let mut buf = Vec::new();

    let mut in_url = false;
    let mut in_sitemap = false;
    let mut current_tag = String::new();
    let mut current_loc = String::new();
    let mut current_lastmod = String::new();
    let mut current_priority = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "url" => {
                        in_url = true;
                        current_loc.clear();
                        current_lastmod.clear();
                        current_priority.clear();
                    }
                    "sitemap" => {
                        in_sitemap = true;
                        current_loc.clear();
                    }
                    _ => {
                        current_tag = name;
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "url" if in_url => {
                        if !current_loc.is_empty() {
                            let lastmod = if current_lastmod.is_empty() {
                                None
                            } else {
                                parse_date(&current_lastmod)
                            };
                            let priority = if current_priority.is_empty() {
                                None
                            } else {
                                current_priority.trim().parse::<f32>().ok()
                            };
                            doc.pages.push(SitemapEntry {
                                url: current_loc.clone(),
                                lastmod,
                                priority,
                            });
                        }
                        in_url = false;
                    }
                    "sitemap" if in_sitemap => {
                        if !current_loc.is_empty() {
                            doc.nested.push(current_loc.clone());
                        }
                        in_sitemap = false;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if (in_url || in_sitemap) && current_tag == "loc" {
                    current_loc = text.trim().to_string();
                } else if in_url && current_tag == "lastmod" {
                    current_lastmod = text.trim().to_string();
                } else if in_url && current_tag == "priority" {
                    current_priority = text.trim().to_string();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!("XML parse error: {e}"));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    // RFC 3339 first
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    // Date-only format
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

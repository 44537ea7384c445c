//! Debug snapshots: three JSON files per run, keyed by hostname+timestamp,
//! for answering "what sections were found, what blocks were produced or
//! rejected, and why" offline. Tooling, not contract — failures here only
//! warn.

use crate::model::{PageSection, SiteScrape};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default scratch directory: `~/.moray/debug`.
pub fn default_debug_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MORAY_DEBUG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".moray/debug")
}

/// Write the full result, the LLM-only view, and the leftover (unconverted)
/// sections. Returns the paths written.
pub fn write_snapshots(
    scrape: &SiteScrape,
    leftovers: &[PageSection],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create debug dir {}", dir.display()))?;

    let hostname = url::Url::parse(&scrape.target_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown-host".to_string());
    let stamp = scrape.crawled_at.format("%Y%m%d%H%M%S");
    let base = format!("{hostname}-{stamp}");

    let full_path = dir.join(format!("{base}.json"));
    write_json(&full_path, &serde_json::to_value(scrape)?)?;

    let llm_view = serde_json::json!({
        "targetUrl": scrape.target_url,
        "pages": scrape
            .pages
            .iter()
            .map(|p| {
                serde_json::json!({
                    "url": p.url,
                    "blockCandidates": p.block_candidates,
                    "ai": p.ai,
                })
            })
            .collect::<Vec<_>>(),
    });
    let llm_path = dir.join(format!("{base}-llm.json"));
    write_json(&llm_path, &llm_view)?;

    let leftover_view = serde_json::json!({
        "targetUrl": scrape.target_url,
        "sections": leftovers,
    });
    let leftover_path = dir.join(format!("{base}-leftover.json"));
    write_json(&leftover_path, &leftover_view)?;

    Ok(vec![full_path, llm_path, leftover_path])
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    std::fs::write(path, pretty)
        .with_context(|| format!("failed to write snapshot {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::Utc;

    fn minimal_scrape() -> SiteScrape {
        SiteScrape {
            target_url: "https://bluedivers.example/".into(),
            crawled_at: Utc::now(),
            colors: ColorPalette::default(),
            fonts: Fonts::default(),
            business: None,
            sitemap: Vec::new(),
            pages: Vec::new(),
            robots_txt: None,
            sitemap_xml_urls: Vec::new(),
            errors: Vec::new(),
            render_css_sample: Vec::new(),
        }
    }

    #[test]
    fn test_three_snapshots_written() {
        let dir = tempfile::tempdir().unwrap();
        let scrape = minimal_scrape();
        let leftovers = vec![PageSection {
            kind: SectionKind::Unknown,
            selector: None,
            heading: Some("Mystery".into()),
            text_sample: None,
            images: Vec::new(),
            confidence: None,
            rationale: None,
            html: None,
        }];

        let paths = write_snapshots(&scrape, &leftovers, dir.path()).unwrap();
        assert_eq!(paths.len(), 3);

        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names[0].starts_with("bluedivers.example-"));
        assert!(names[0].ends_with(".json"));
        assert!(names[1].ends_with("-llm.json"));
        assert!(names[2].ends_with("-leftover.json"));

        let leftover_body = std::fs::read_to_string(&paths[2]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&leftover_body).unwrap();
        assert_eq!(parsed["sections"][0]["heading"], "Mystery");
    }

    #[test]
    fn test_full_snapshot_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let scrape = minimal_scrape();
        let paths = write_snapshots(&scrape, &[], dir.path()).unwrap();
        let body = std::fs::read_to_string(&paths[0]).unwrap();
        let back: SiteScrape = serde_json::from_str(&body).unwrap();
        assert_eq!(back.target_url, scrape.target_url);
    }
}

//! Site orchestrator: compose discovery, rendering, extraction,
//! segmentation, and classification into one `SiteScrape`.
//!
//! Strictly sequential — every stage depends on the previous one's output.
//! Per-resource failures degrade to missing data; the only fatal gate is
//! final aggregate validation.

pub mod progress;
pub mod snapshot;

use crate::classify::converter::convert_section;
use crate::classify::llm::ChatClient;
use crate::classify::segmenter::segment_sections;
use crate::discovery::{self, build_site_tree, to_origin};
use crate::extraction::{business, page as page_extract, sections, styles};
use crate::fetch::FetchClient;
use crate::model::*;
use crate::renderer::{RenderedPage, Renderer};
use anyhow::{Context, Result};
use progress::{IngestStage, ProgressReporter, ProgressSender};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// How pages are segmented into sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStrategy {
    /// Whole-page LLM segmentation (falls back to heuristics when no chat
    /// client is configured).
    Llm,
    /// DOM heuristics only.
    Heuristic,
}

/// Tunables for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Page budget for crawl-fallback discovery.
    pub max_pages: usize,
    /// Bound on one browser navigation.
    pub nav_timeout_ms: u64,
    /// Bound on one plain HTTP fetch.
    pub fetch_timeout_ms: u64,
    /// Cap on stylesheets fetched for style mining.
    pub max_stylesheets: usize,
    pub strategy: SegmentStrategy,
    /// Where debug snapshots go; None disables them.
    pub debug_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_pages: 25,
            nav_timeout_ms: crate::renderer::chromium::DEFAULT_NAV_TIMEOUT_MS,
            fetch_timeout_ms: 10_000,
            max_stylesheets: 20,
            strategy: SegmentStrategy::Llm,
            debug_dir: Some(snapshot::default_debug_dir()),
        }
    }
}

/// One ingestion run's worth of pipeline. Owns its renderer; `scrape_site`
/// releases it on every path.
pub struct SiteIngestor {
    fetch: FetchClient,
    renderer: Arc<dyn Renderer>,
    chat: Option<Arc<dyn ChatClient>>,
    config: IngestConfig,
    progress: ProgressReporter,
}

impl SiteIngestor {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        chat: Option<Arc<dyn ChatClient>>,
        config: IngestConfig,
    ) -> Self {
        let fetch = FetchClient::new(config.fetch_timeout_ms);
        Self {
            fetch,
            renderer,
            chat,
            config,
            progress: ProgressReporter::disabled(),
        }
    }

    /// Attach a progress channel for the task-queue boundary.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = ProgressReporter::new(Some(tx));
        self
    }

    /// Run the full pipeline for one site. The browser is released whether
    /// the run succeeds or fails.
    pub async fn scrape_site(&self, target_url: &str) -> Result<SiteScrape> {
        let result = self.scrape_inner(target_url).await;
        if let Err(e) = self.renderer.close().await {
            warn!("renderer close failed: {e}");
        }
        result
    }

    async fn scrape_inner(&self, target_url: &str) -> Result<SiteScrape> {
        let origin = to_origin(target_url)
            .with_context(|| format!("target URL is not absolute: {target_url}"))?;
        let crawled_at = chrono::Utc::now();
        let mut errors: Vec<String> = Vec::new();

        self.progress
            .update(IngestStage::Init, 0, 0, 1, format!("ingesting {target_url}"));

        // 1. URL discovery.
        let discovery =
            discovery::discover_urls(&self.fetch, target_url, self.config.max_pages).await;
        info!(
            "discovered {} URLs ({} sitemaps{})",
            discovery.urls.len(),
            discovery.sitemap_urls.len(),
            if discovery.used_crawl_fallback {
                ", via crawl fallback"
            } else {
                ""
            }
        );
        self.progress.update(
            IngestStage::Discover,
            15,
            0,
            1,
            format!("found {} candidate URLs", discovery.urls.len()),
        );

        // 2. Home render + style/business signals. Failure leaves defaults.
        let home = self.renderer.render(target_url).await;
        self.progress
            .update(IngestStage::Render, 35, 0, 1, "home page rendered");

        let (colors, fonts, business, render_css_sample) = match &home {
            Ok(rendered) => self.mine_home_signals(rendered, &origin).await,
            Err(e) => {
                warn!("home render failed: {e}");
                errors.push(format!("render {target_url}: {e}"));
                (
                    ColorPalette::default(),
                    Fonts::default(),
                    None,
                    Vec::new(),
                )
            }
        };
        self.progress
            .update(IngestStage::Extract, 55, 0, 1, "signals extracted");

        // 3. Single-page mode: only the home URL is segmented and
        //    classified. The discovered URL set still feeds the site tree.
        let mut leftovers: Vec<PageSection> = Vec::new();
        let page = self
            .scrape_page(target_url, home.as_ref().ok(), &mut leftovers)
            .await;
        let pages = vec![page];

        // 4. Assemble and gate the aggregate.
        let scrape = SiteScrape {
            target_url: target_url.to_string(),
            crawled_at,
            colors,
            fonts,
            business,
            sitemap: build_site_tree(&origin, &discovery.urls),
            pages,
            robots_txt: discovery.robots_txt,
            sitemap_xml_urls: discovery.sitemap_urls,
            errors,
            render_css_sample,
        };
        scrape.validate()?;

        // 5. Debug snapshots — tooling, never fatal.
        if let Some(dir) = &self.config.debug_dir {
            match snapshot::write_snapshots(&scrape, &leftovers, dir) {
                Ok(paths) => info!("wrote {} debug snapshots", paths.len()),
                Err(e) => warn!("debug snapshots failed: {e}"),
            }
        }

        let blocks: usize = scrape.pages.iter().map(|p| p.block_candidates.len()).sum();
        self.progress.update_with_partial(
            IngestStage::Done,
            100,
            1,
            1,
            format!("{blocks} block candidates"),
            serde_json::json!({
                "pages": scrape.pages.len(),
                "blocks": blocks,
                "primaryColor": scrape.colors.primary,
            }),
        );

        Ok(scrape)
    }

    /// Fetch stylesheets and mine colors, fonts, and the business profile
    /// from the rendered home page. Individual stylesheet failures are
    /// skipped.
    async fn mine_home_signals(
        &self,
        rendered: &RenderedPage,
        origin: &str,
    ) -> (ColorPalette, Fonts, Option<BusinessProfile>, Vec<String>) {
        let mut css_blobs: Vec<String> = Vec::new();
        for css_url in rendered.css_urls.iter().take(self.config.max_stylesheets) {
            if let Some(body) = self.fetch.get_text(css_url).await {
                css_blobs.push(body);
            }
        }
        css_blobs.extend(styles::inline_style_blocks(&rendered.html));

        let ranked = styles::score_colors(&css_blobs);
        let colors = styles::pick_palette(&ranked);
        let fonts = styles::extract_fonts(&rendered.html, &css_blobs);
        let business = business::extract_business(&rendered.html, origin);

        let sample = css_blobs
            .iter()
            .take(3)
            .map(|blob| blob.chars().take(400).collect::<String>())
            .collect();

        (colors, fonts, Some(business), sample)
    }

    /// Produce one `ScrapedPage`. A failed render yields a minimal record —
    /// the page is kept, not omitted.
    async fn scrape_page(
        &self,
        url: &str,
        rendered: Option<&RenderedPage>,
        leftovers: &mut Vec<PageSection>,
    ) -> ScrapedPage {
        let slug = slug_for_url(url);
        let Some(rendered) = rendered else {
            return ScrapedPage {
                url: url.to_string(),
                slug,
                title: None,
                html: None,
                text: None,
                sections: Vec::new(),
                block_candidates: Vec::new(),
                images: Vec::new(),
                seo: SeoMeta::default(),
                render: None,
                ai: None,
            };
        };

        let seo = page_extract::extract_seo(&rendered.html);
        let title = seo.title.clone().or_else(|| seo.og.title.clone());
        let text = page_extract::extract_text(&rendered.html);
        let images = page_extract::extract_images(&rendered.html, &rendered.final_url);

        let sections = match (&self.config.strategy, &self.chat) {
            (SegmentStrategy::Llm, Some(chat)) => {
                segment_sections(chat.as_ref(), &rendered.html, &text).await
            }
            _ => sections::infer_sections(&rendered.html),
        };

        let mut block_candidates: Vec<LlmBlockCandidate> = Vec::new();
        let total = sections.len() as u32;
        for (order, section) in sections.iter().enumerate() {
            self.progress.update(
                IngestStage::Classify,
                70 + ((order as u32 * 20) / total.max(1)) as u8,
                order as u32,
                total,
                format!("classifying {} section", section.kind),
            );

            let target = section.kind.block_type();
            let converted = match (target, &self.chat) {
                (Some(target), Some(chat)) => {
                    convert_section(chat.as_ref(), section, target, order).await
                }
                _ => None,
            };
            match converted {
                Some(candidate) => block_candidates.push(candidate),
                None => leftovers.push(section.clone()),
            }
        }

        let ai = self.chat.as_ref().map(|_| {
            let confidences: Vec<f32> = sections.iter().filter_map(|s| s.confidence).collect();
            PageAi {
                llm_blocks: block_candidates.len() as u32,
                notes: None,
                confidence: if confidences.is_empty() {
                    None
                } else {
                    Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
                },
            }
        });

        ScrapedPage {
            url: url.to_string(),
            slug,
            title,
            html: Some(rendered.html.clone()),
            text: Some(text),
            sections,
            block_candidates,
            images,
            seo,
            render: Some(RenderStats {
                final_url: rendered.final_url.clone(),
                load_time_ms: rendered.load_time_ms,
                stylesheet_count: rendered.css_urls.len(),
            }),
            ai,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NoopRenderer;

    #[tokio::test]
    async fn test_render_failure_keeps_defaults_and_page_record() {
        let config = IngestConfig {
            debug_dir: None,
            ..IngestConfig::default()
        };
        let ingestor = SiteIngestor::new(Arc::new(NoopRenderer), None, config);

        let scrape = ingestor
            .scrape_site("https://unreachable.invalid/")
            .await
            .expect("run must survive a render failure");

        assert_eq!(scrape.pages.len(), 1);
        let page = &scrape.pages[0];
        assert!(page.html.is_none());
        assert!(page.text.is_none());
        assert!(page.block_candidates.is_empty());
        assert_eq!(page.slug, "home");
        assert!(scrape.colors.primary.is_none());
        assert!(!scrape.errors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_target_url_is_fatal() {
        let config = IngestConfig {
            debug_dir: None,
            ..IngestConfig::default()
        };
        let ingestor = SiteIngestor::new(Arc::new(NoopRenderer), None, config);
        assert!(ingestor.scrape_site("not-a-url").await.is_err());
    }
}

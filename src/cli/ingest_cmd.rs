//! `moray ingest <url>` — run the full pipeline against one site.

use super::output;
use crate::classify::llm::OpenAiChatClient;
use crate::pipeline::progress;
use crate::pipeline::{IngestConfig, SegmentStrategy, SiteIngestor};
use crate::renderer::chromium::ChromiumRenderer;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

pub async fn run(
    url: &str,
    max_pages: usize,
    heuristic_sections: bool,
    debug_dir: Option<PathBuf>,
    no_snapshots: bool,
) -> Result<()> {
    let mut config = IngestConfig {
        max_pages,
        ..IngestConfig::default()
    };
    if heuristic_sections {
        config.strategy = SegmentStrategy::Heuristic;
    }
    if no_snapshots {
        config.debug_dir = None;
    } else if let Some(dir) = debug_dir {
        config.debug_dir = Some(dir);
    }

    let renderer = ChromiumRenderer::launch(config.nav_timeout_ms)
        .await
        .context("failed to start the browser")?;

    // The LLM is optional: without it the run still produces styles,
    // business profile, and heuristic sections.
    let chat = match OpenAiChatClient::from_env() {
        Ok(client) => Some(Arc::new(client) as Arc<dyn crate::classify::llm::ChatClient>),
        Err(e) => {
            warn!("LLM disabled: {e}");
            None
        }
    };

    let (tx, mut rx) = progress::channel();
    let progress_printer = tokio::spawn(async move {
        while let Ok(update) = rx.recv().await {
            if !output::is_quiet() && !output::is_json() {
                eprintln!(
                    "  [{:>3}%] {:<9} {}",
                    update.percentage, update.stage, update.message
                );
            }
        }
    });

    let ingestor = SiteIngestor::new(Arc::new(renderer), chat, config).with_progress(tx);
    let result = ingestor.scrape_site(url).await;
    progress_printer.abort();

    let scrape = result?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&scrape)?);
        return Ok(());
    }

    let import = scrape.to_shop_import();
    println!("Ingested {}", scrape.target_url);
    if let Some(name) = &import.name {
        println!("  business : {name}");
    }
    if let Some(phone) = &import.phone_number {
        println!("  phone    : {phone}");
    }
    if let Some(primary) = &import.primary_color {
        println!("  primary  : {primary}");
    }
    if let Some(fonts) = scrape
        .fonts
        .heading
        .as_deref()
        .or(scrape.fonts.body.as_deref())
    {
        println!("  fonts    : {fonts}");
    }
    for page in &scrape.pages {
        println!(
            "  page {} — {} sections, {} block candidates",
            page.slug,
            page.sections.len(),
            page.block_candidates.len()
        );
    }
    if !scrape.errors.is_empty() {
        println!("  {} non-fatal errors (see debug snapshots)", scrape.errors.len());
    }

    Ok(())
}

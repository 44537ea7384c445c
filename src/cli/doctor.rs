//! Environment readiness check.

use crate::pipeline::snapshot::default_debug_dir;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;

/// Check Chromium availability, LLM configuration, and the snapshot dir.
pub async fn run() -> Result<()> {
    println!("Moray Doctor");
    println!("============");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install google-chrome/chromium or set MORAY_CHROMIUM_PATH."
        ),
    }

    let has_key =
        std::env::var("MORAY_LLM_API_KEY").is_ok() || std::env::var("OPENAI_API_KEY").is_ok();
    if has_key {
        println!("[OK] LLM API key configured");
    } else {
        println!("[!!] No LLM API key (MORAY_LLM_API_KEY). Ingestion runs without block classification.");
    }

    let debug_dir = default_debug_dir();
    match std::fs::create_dir_all(&debug_dir) {
        Ok(()) => println!("[OK] Snapshot dir writable: {}", debug_dir.display()),
        Err(e) => println!("[!!] Snapshot dir {} not writable: {e}", debug_dir.display()),
    }

    println!();
    if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod classify;
mod cli;
mod discovery;
mod error;
mod extraction;
mod fetch;
mod model;
mod pipeline;
mod renderer;

#[derive(Parser)]
#[command(
    name = "moray",
    about = "Moray — website-ingestion engine for the dive-shop site builder",
    version,
    after_help = "Run 'moray <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a business website into a SiteScrape
    Ingest {
        /// Absolute URL of the site to ingest
        url: String,
        /// Page budget for crawl-fallback discovery
        #[arg(long, default_value = "25")]
        max_pages: usize,
        /// Use DOM heuristics instead of LLM section segmentation
        #[arg(long)]
        heuristic_sections: bool,
        /// Directory for debug snapshots (default ~/.moray/debug)
        #[arg(long)]
        debug_dir: Option<PathBuf>,
        /// Skip writing debug snapshots
        #[arg(long)]
        no_snapshots: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Global flags travel via environment so all modules can check them.
    if cli.json {
        std::env::set_var("MORAY_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("MORAY_QUIET", "1");
    }

    let default_directive = if cli.verbose { "moray=debug" } else { "moray=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Ingest {
            url,
            max_pages,
            heuristic_sections,
            debug_dir,
            no_snapshots,
        } => cli::ingest_cmd::run(&url, max_pages, heuristic_sections, debug_dir, no_snapshots)
            .await,
        Commands::Doctor => cli::doctor::run().await,
    };

    if let Err(e) = &result {
        if cli.json {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli.quiet {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

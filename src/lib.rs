//! Moray — website-ingestion engine for the dive-shop site builder.
//!
//! Given a business's existing website URL, the pipeline discovers pages
//! (sitemap → crawl fallback), renders them with a headless browser, mines
//! style and business-identity signals, segments pages into semantic
//! sections, and classifies those sections into typed, schema-validated
//! content blocks.
//!
//! This library crate exposes the pipeline modules for integration testing;
//! the `moray` binary wraps them in a CLI.

pub mod classify;
pub mod cli;
pub mod discovery;
pub mod error;
pub mod extraction;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod renderer;

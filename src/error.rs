//! Run-fatal error taxonomy.
//!
//! Most failures in the pipeline are swallowed as missing data (per-resource)
//! or recorded on the aggregate (page-level). The variants here are the ones
//! callers actually branch on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The assembled `SiteScrape` does not conform to the downstream
    /// contract. There is no silent downgrade at this gate.
    #[error("aggregate validation failed: {0}")]
    InvalidAggregate(String),

    /// Browser navigation failed or timed out for a page.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The browser binary could not be found or launched.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),
}

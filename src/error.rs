//! Error taxonomy for crawl operations.
//!
//! Missing elements are deliberately absent from this enum: a selector that
//! matches nothing is data (`"N/A"`), not a failure.

use thiserror::Error;

/// Errors raised by the rendering backend, the image store, the sinks and
/// site configuration validation.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A page could not be opened or navigated to.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A control did not become clickable within its wait budget.
    #[error("timed out after {budget_ms}ms waiting for '{selector}'")]
    Timeout { selector: String, budget_ms: u64 },

    /// An image could not be fetched or written.
    #[error("image download from {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// Invalid site configuration. Raised before any navigation.
    #[error("invalid site configuration: {0}")]
    Config(String),

    /// The tabular sink rejected a write.
    #[error("failed to write records: {0}")]
    Sink(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Shorthand for a navigation failure.
    pub fn navigation(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CrawlError::Navigation { url: url.into(), reason: reason.to_string() }
    }

    /// Shorthand for a download failure.
    pub fn download(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CrawlError::Download { url: url.into(), reason: reason.to_string() }
    }

    /// Returns true for the pagination wait-budget signal.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::Timeout { .. })
    }
}

impl From<csv::Error> for CrawlError {
    fn from(e: csv::Error) -> Self {
        CrawlError::Sink(e.to_string())
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(e: serde_json::Error) -> Self {
        CrawlError::Sink(e.to_string())
    }
}

/// Result alias for crawl operations.
pub type Result<T, E = CrawlError> = std::result::Result<T, E>;

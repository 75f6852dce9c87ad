//! Data models for navbar links, product records and crawl results.

use serde::{Deserialize, Serialize};

/// Sentinel for a legitimately absent field value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Converts an optional field value into its record form.
pub fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// A navigation entry pointing to a category listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Visible label (first text line of the navbar item)
    pub label: String,
    /// Absolute URL of the listing page
    pub url: String,
    /// Label of the enclosing group, when navbar grouping is in use
    pub parent: Option<String>,
}

impl NavLink {
    /// Creates an ungrouped link.
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { label: label.into(), url: url.into(), parent: None }
    }

    /// Sets the parent group label.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// One extracted product. Every field is present; absent values hold
/// [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    /// Digits only
    pub sku: String,
    pub category: String,
    pub sub_category: String,
    pub short_description: String,
    pub long_description: String,
    /// Canonical (full-resolution) image URL
    pub image_url: String,
    /// Local path of the downloaded image
    pub image_path: String,
    pub price: String,
    /// URL of the product page itself
    pub source_url: String,
}

impl ProductRecord {
    /// Field names and values, in record order.
    pub fn fields(&self) -> [(&'static str, &str); 10] {
        [
            ("name", &self.name),
            ("sku", &self.sku),
            ("category", &self.category),
            ("sub_category", &self.sub_category),
            ("short_description", &self.short_description),
            ("long_description", &self.long_description),
            ("image_url", &self.image_url),
            ("image_path", &self.image_path),
            ("price", &self.price),
            ("source_url", &self.source_url),
        ]
    }

    /// Returns true when `field` holds the sentinel.
    pub fn is_missing(&self, field: &str) -> bool {
        self.fields().iter().any(|(name, value)| *name == field && *value == NOT_AVAILABLE)
    }

    /// Returns true when an image was downloaded for this record.
    pub fn has_image(&self) -> bool {
        self.image_path != NOT_AVAILABLE
    }
}

/// Result of crawling a single site.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteCrawl {
    pub site: String,
    /// Records in visit order
    pub records: Vec<ProductRecord>,
    pub categories_visited: usize,
    pub categories_failed: usize,
    pub products_failed: usize,
    /// Set when the site could not be crawled at all
    pub failure: Option<String>,
}

impl SiteCrawl {
    /// Creates an empty result for `site`.
    pub fn new(site: impl Into<String>) -> Self {
        Self { site: site.into(), ..Self::default() }
    }

    /// Number of extracted records.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records were extracted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

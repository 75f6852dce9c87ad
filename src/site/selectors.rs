//! Per-site selector configuration.
//!
//! A [`SiteConfig`] is what the config file holds. It becomes an immutable
//! [`SelectorConfig`] only after [`SiteConfig::validate`] succeeds, so the
//! crawl engine never sees a site missing its navbar or product-list
//! selector.

use crate::error::{CrawlError, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical product fields that can be bound to a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Sku,
    Price,
    Category,
    ShortDescription,
    LongDescription,
    Image,
}

impl Field {
    /// All fields, in record order.
    pub fn all() -> [Field; 7] {
        [
            Field::Name,
            Field::Sku,
            Field::Price,
            Field::Category,
            Field::ShortDescription,
            Field::LongDescription,
            Field::Image,
        ]
    }

    /// Key used in configuration files and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Sku => "sku",
            Field::Price => "price",
            Field::Category => "category",
            Field::ShortDescription => "short_description",
            Field::LongDescription => "long_description",
            Field::Image => "image",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selector for one field: either element text, or an attribute value.
///
/// In TOML: `name = "h1"` or `short_description = { css = "meta[property='og:description']", attr = "content" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelector {
    Text(String),
    Attr { css: String, attr: String },
}

impl FieldSelector {
    /// The CSS selector expression.
    pub fn css(&self) -> &str {
        match self {
            FieldSelector::Text(css) => css,
            FieldSelector::Attr { css, .. } => css,
        }
    }

    /// The attribute to read, if any.
    pub fn attr(&self) -> Option<&str> {
        match self {
            FieldSelector::Text(_) => None,
            FieldSelector::Attr { attr, .. } => Some(attr),
        }
    }
}

/// Field selectors for product pages. Every entry is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelectors {
    #[serde(default)]
    pub name: Option<FieldSelector>,
    #[serde(default)]
    pub sku: Option<FieldSelector>,
    #[serde(default)]
    pub price: Option<FieldSelector>,
    #[serde(default)]
    pub category: Option<FieldSelector>,
    #[serde(default)]
    pub short_description: Option<FieldSelector>,
    #[serde(default)]
    pub long_description: Option<FieldSelector>,
    /// Bare strings read the `src` attribute.
    #[serde(default)]
    pub image: Option<FieldSelector>,
}

impl FieldSelectors {
    /// Selector bound to `field`, if configured.
    pub fn get(&self, field: Field) -> Option<&FieldSelector> {
        match field {
            Field::Name => self.name.as_ref(),
            Field::Sku => self.sku.as_ref(),
            Field::Price => self.price.as_ref(),
            Field::Category => self.category.as_ref(),
            Field::ShortDescription => self.short_description.as_ref(),
            Field::LongDescription => self.long_description.as_ref(),
            Field::Image => self.image.as_ref(),
        }
    }
}

/// Where a record's category columns come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorySource {
    /// The `category` field selector on the product page.
    #[default]
    Selector,
    /// The navbar entry (and its parent group) the product was found under.
    Navbar,
}

/// Site entry as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name, also used for output paths and the `Website` column.
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub navbar_item: Option<String>,
    #[serde(default)]
    pub product_list: Option<String>,
    #[serde(default)]
    pub load_more: Option<String>,
    #[serde(default)]
    pub category_source: CategorySource,
    #[serde(default)]
    pub fields: FieldSelectors,
}

impl SiteConfig {
    /// Checks required selectors and selector syntax.
    pub fn validate(&self) -> Result<SelectorConfig> {
        let site = if self.name.trim().is_empty() { "<unnamed>" } else { self.name.as_str() };

        let base_url = url::Url::parse(self.base_url.trim())
            .map_err(|e| config_error(site, format!("base_url '{}': {}", self.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(config_error(site, format!("base_url '{}' is not http(s)", base_url)));
        }

        let navbar_item = required(site, "navbar_item", self.navbar_item.as_deref())?;
        let product_list = required(site, "product_list", self.product_list.as_deref())?;

        let load_more = match self.load_more.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(css) => Some(check_css(site, "load_more", css)?),
        };

        for field in Field::all() {
            if let Some(selector) = self.fields.get(field) {
                check_css(site, field.as_str(), selector.css())?;
            }
        }

        Ok(SelectorConfig {
            name: self.name.trim().to_string(),
            base_url: self.base_url.trim().to_string(),
            navbar_item,
            product_list,
            load_more,
            category_source: self.category_source,
            fields: self.fields.clone(),
        })
    }
}

/// Validated, immutable per-site selector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub name: String,
    pub base_url: String,
    pub navbar_item: String,
    pub product_list: String,
    pub load_more: Option<String>,
    pub category_source: CategorySource,
    pub fields: FieldSelectors,
}

impl SelectorConfig {
    /// Directory-safe form of the site name.
    pub fn slug(&self) -> String {
        self.name.replace('.', "_")
    }
}

fn required(site: &str, key: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(css) if !css.is_empty() => check_css(site, key, css),
        _ => Err(config_error(site, format!("missing required selector '{}'", key))),
    }
}

fn check_css(site: &str, key: &str, css: &str) -> Result<String> {
    Selector::parse(css)
        .map(|_| css.to_string())
        .map_err(|e| config_error(site, format!("selector '{}' ({}) does not parse: {}", key, css, e)))
}

fn config_error(site: &str, message: String) -> CrawlError {
    CrawlError::Config(format!("{}: {}", site, message))
}

//! Product page extraction.
//!
//! Extraction never fails: a selector that is not configured, matches
//! nothing, or errors in the backend yields `None` for that field, which the
//! record stores as `"N/A"`.

use crate::images::ImageStore;
use crate::render::{Element, Session};
use crate::site::models::{or_na, NavLink, ProductRecord, NOT_AVAILABLE};
use crate::site::selectors::{CategorySource, Field, FieldSelector, FieldSelectors, SelectorConfig};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// Thumbnail size suffix before the extension, e.g. `-300x300.jpg`.
static SIZE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+x\d+(\.[A-Za-z0-9]+)?([?#].*)?$").unwrap());

/// Builds [`ProductRecord`]s from product pages.
pub struct Extractor<'a> {
    site: &'a str,
    fields: &'a FieldSelectors,
    category_source: CategorySource,
    images: Option<&'a dyn ImageStore>,
}

impl<'a> Extractor<'a> {
    /// Creates an extractor for a site. Image downloads are off.
    pub fn new(config: &'a SelectorConfig) -> Self {
        Self {
            site: &config.name,
            fields: &config.fields,
            category_source: config.category_source,
            images: None,
        }
    }

    /// Downloads product images into `store`.
    pub fn with_images(mut self, store: &'a dyn ImageStore) -> Self {
        self.images = Some(store);
        self
    }

    /// Extracts the product on the session's current page.
    ///
    /// `nav` is the navbar entry the product was discovered under.
    pub async fn extract(&self, session: &dyn Session, nav: Option<&NavLink>) -> ProductRecord {
        let source_url = session.current_url();
        trace!("Extracting product at {}", source_url);

        let name = self.field(session, Field::Name).await;
        let sku = self.field(session, Field::Sku).await.and_then(|s| normalize_sku(&s));
        let price = self.field(session, Field::Price).await;
        let short_description = self.field(session, Field::ShortDescription).await;
        let long_description = self.field(session, Field::LongDescription).await;
        let image_url = self.field(session, Field::Image).await.map(|u| canonical_image_url(&u));

        let (category, sub_category) = match (self.category_source, nav) {
            (CategorySource::Navbar, Some(nav)) => match &nav.parent {
                Some(parent) => (Some(parent.clone()), Some(nav.label.clone())),
                None => (Some(nav.label.clone()), None),
            },
            _ => (self.field(session, Field::Category).await, None),
        };

        let image_path = match &image_url {
            Some(url) => self.download_image(url, name.as_deref()).await,
            None => None,
        };

        ProductRecord {
            name: or_na(name),
            sku: or_na(sku),
            category: or_na(category),
            sub_category: or_na(sub_category),
            short_description: or_na(short_description),
            long_description: or_na(long_description),
            image_url: or_na(image_url),
            image_path: or_na(image_path),
            price: or_na(price),
            source_url,
        }
    }

    /// Looks up one field. Every failure mode is `None`.
    async fn field(&self, session: &dyn Session, field: Field) -> Option<String> {
        let selector = self.fields.get(field)?;

        let element = match session.query_one(selector.css()).await {
            Ok(Some(element)) => element,
            Ok(None) => {
                debug!("No match for {} ('{}') at {}", field, selector.css(), session.current_url());
                return None;
            }
            Err(e) => {
                warn!("Lookup of {} failed at {}: {}", field, session.current_url(), e);
                return None;
            }
        };

        let value = value_of(&element, selector, field)?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    async fn download_image(&self, url: &str, name: Option<&str>) -> Option<String> {
        let store = self.images?;
        let hint = format!("{}_{}", self.site, name.unwrap_or("product"));

        match store.download(url, &hint).await {
            Ok(path) => Some(path.display().to_string()),
            Err(e) => {
                warn!("Image download failed for {}: {}", url, e);
                None
            }
        }
    }
}

fn value_of(element: &Element, selector: &FieldSelector, field: Field) -> Option<String> {
    match (selector.attr(), field) {
        (Some(attr), _) => element.attribute(attr).map(String::from),
        (None, Field::Image) => {
            element.attribute("src").or_else(|| element.attribute("data-src")).map(String::from)
        }
        (None, _) => Some(element.text().to_string()),
    }
}

/// Keeps only the digits of a SKU. Returns `None` when none remain.
pub fn normalize_sku(text: &str) -> Option<String> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Strips a trailing `-<width>x<height>` thumbnail suffix from an image URL.
pub fn canonical_image_url(url: &str) -> String {
    if url == NOT_AVAILABLE {
        return url.to_string();
    }
    SIZE_SUFFIX.replace(url, "${1}${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sku() {
        assert_eq!(normalize_sku("SKU: AB-1234-X"), Some("1234".to_string()));
        assert_eq!(normalize_sku(" 0042 "), Some("0042".to_string()));
        assert_eq!(normalize_sku("12-34"), Some("1234".to_string()));
        assert_eq!(normalize_sku("SKU: none"), None);
    }

    #[test]
    fn test_canonical_image_url() {
        assert_eq!(
            canonical_image_url("https://shop.test/uploads/photo-300x300.jpg"),
            "https://shop.test/uploads/photo.jpg"
        );
        assert_eq!(
            canonical_image_url("https://shop.test/uploads/dog-food-1024x768.png?ver=2"),
            "https://shop.test/uploads/dog-food.png?ver=2"
        );
        assert_eq!(
            canonical_image_url("https://shop.test/uploads/photo-300x300"),
            "https://shop.test/uploads/photo"
        );
    }

    #[test]
    fn test_canonical_image_url_untouched() {
        for url in [
            "https://shop.test/uploads/photo.jpg",
            "https://shop.test/800x600-gallery/img.jpg",
            "https://shop.test/uploads/photo-300.jpg",
        ] {
            assert_eq!(canonical_image_url(url), url);
        }
    }

    #[test]
    fn test_value_of_attribute_and_text() {
        let meta = Element::new("").with_attr("content", "Short text");
        let selector = FieldSelector::Attr { css: "meta".to_string(), attr: "content".to_string() };
        assert_eq!(
            value_of(&meta, &selector, Field::ShortDescription),
            Some("Short text".to_string())
        );

        let missing = FieldSelector::Attr { css: "meta".to_string(), attr: "name".to_string() };
        assert_eq!(value_of(&meta, &missing, Field::ShortDescription), None);

        let h1 = Element::new("  Dry Food  ");
        let text = FieldSelector::Text("h1".to_string());
        assert_eq!(value_of(&h1, &text, Field::Name), Some("  Dry Food  ".to_string()));
    }

    #[test]
    fn test_value_of_image_defaults_to_src() {
        let selector = FieldSelector::Text("img".to_string());
        let img = Element::new("").with_attr("src", "https://shop.test/a.jpg");
        assert_eq!(value_of(&img, &selector, Field::Image), Some("https://shop.test/a.jpg".into()));

        let lazy = Element::new("").with_attr("data-src", "https://shop.test/b.jpg");
        assert_eq!(value_of(&lazy, &selector, Field::Image), Some("https://shop.test/b.jpg".into()));
    }
}

//! Page-rendering capability consumed by the crawl engine.
//!
//! The engine never talks to a browser or HTTP client directly. It drives a
//! [`Session`] obtained from a [`Renderer`], and reads element snapshots
//! ([`Element`]) out of the current document.

pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use http::HttpRenderer;

/// Opens rendering sessions. One session serves one site crawl.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a session positioned on `url`.
    async fn open(&self, url: &str) -> Result<Box<dyn Session>>;
}

/// A single rendering session. Not safe for concurrent navigation, so every
/// mutating call takes `&mut self`.
#[async_trait]
pub trait Session: Send + Sync {
    /// Loads `url` as the current document.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current document.
    fn current_url(&self) -> String;

    /// All elements matching a CSS selector, in document order.
    async fn query(&self, selector: &str) -> Result<Vec<Element>>;

    /// First element matching a CSS selector.
    async fn query_one(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.query(selector).await?.into_iter().next())
    }

    /// Waits up to `budget` for an enabled element matching `selector`.
    ///
    /// Fails with [`CrawlError::Timeout`](crate::CrawlError::Timeout) when the
    /// budget runs out.
    async fn wait_until_clickable(&mut self, selector: &str, budget: Duration) -> Result<Element>;

    /// Activates a control previously returned by
    /// [`wait_until_clickable`](Session::wait_until_clickable).
    async fn click(&mut self, control: &Element) -> Result<()>;

    /// Releases the session.
    async fn close(&mut self) -> Result<()>;
}

/// Owned snapshot of a matched element.
///
/// URL-valued attributes (`href`, `src`) are already absolute, the same as a
/// browser reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    text: String,
    attributes: HashMap<String, String>,
    link: Option<String>,
}

impl Element {
    /// Creates an element with the given text content.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if name == "href" && self.link.is_none() {
            self.link = Some(value.clone());
        }
        self.attributes.insert(name, value);
        self
    }

    /// Sets the hyperlink carried by the element or its first descendant anchor.
    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.link = Some(href.into());
        self
    }

    /// Raw text content, including inner line breaks.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The element's own `href`, or that of its first descendant anchor.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// False for controls marked `disabled` or `aria-disabled="true"`.
    pub fn is_enabled(&self) -> bool {
        self.attribute("disabled").is_none()
            && self.attribute("aria-disabled").map_or(true, |v| !v.eq_ignore_ascii_case("true"))
    }
}

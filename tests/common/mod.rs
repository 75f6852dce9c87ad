//! In-memory rendering backend for crawl tests.
//!
//! Pages are keyed by URL. A listing page reveals its product batches one
//! load-more click at a time.

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_crawler::error::{CrawlError, Result};
use catalog_crawler::images::ImageStore;
use catalog_crawler::render::{Element, Renderer, Session};
use catalog_crawler::site::{SelectorConfig, SiteConfig};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NAVBAR: &str = "nav li";
pub const PRODUCTS: &str = ".product a";
pub const LOAD_MORE: &str = "button.load-more";

/// Scripted document.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<Element>>,
    batches: Vec<Vec<Element>>,
    control: Option<String>,
    sticky_control: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements returned for `selector`.
    pub fn with(mut self, selector: &str, elements: Vec<Element>) -> Self {
        self.elements.entry(selector.to_string()).or_default().extend(elements);
        self
    }

    /// A single text element for `selector`.
    pub fn text(self, selector: &str, text: &str) -> Self {
        self.with(selector, vec![Element::new(text)])
    }

    /// Product links, one batch revealed per load-more click.
    pub fn listing(mut self, batches: &[&[&str]]) -> Self {
        self.batches = batches
            .iter()
            .map(|batch| batch.iter().map(|url| Element::new(*url).with_link(*url)).collect())
            .collect();
        self
    }

    /// Load-more control, clickable while batches remain hidden.
    pub fn load_more(mut self) -> Self {
        self.control = Some(LOAD_MORE.to_string());
        self
    }

    /// Load-more control that stays clickable after the last batch.
    pub fn sticky_load_more(mut self) -> Self {
        self.control = Some(LOAD_MORE.to_string());
        self.sticky_control = true;
        self
    }
}

/// What the fake backend was asked to do.
#[derive(Debug, Default)]
pub struct Log {
    pub opened: usize,
    pub closed: usize,
    pub clicks: usize,
    pub navigations: Vec<String>,
}

/// Renderer over scripted pages.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pages: HashMap<String, FakePage>,
    failing: HashSet<String>,
    log: Arc<Mutex<Log>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Navigation to `url` fails.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    pub fn clicks(&self) -> usize {
        self.log.lock().unwrap().clicks
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().navigations.clone()
    }

    /// How many times `url` was navigated to.
    pub fn visits(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn Session>> {
        self.log.lock().unwrap().opened += 1;
        let mut session = FakeSession {
            pages: self.pages.clone(),
            failing: self.failing.clone(),
            log: self.log.clone(),
            current: String::new(),
            revealed: 0,
        };
        session.navigate(url).await?;
        Ok(Box::new(session))
    }
}

struct FakeSession {
    pages: HashMap<String, FakePage>,
    failing: HashSet<String>,
    log: Arc<Mutex<Log>>,
    current: String,
    revealed: usize,
}

impl FakeSession {
    fn page(&self) -> Option<&FakePage> {
        self.pages.get(&self.current)
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());

        if self.failing.contains(url) {
            return Err(CrawlError::navigation(url, "connection reset"));
        }
        if !self.pages.contains_key(url) {
            return Err(CrawlError::navigation(url, "status 404"));
        }

        self.current = url.to_string();
        self.revealed = 1;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current.clone()
    }

    async fn query(&self, selector: &str) -> Result<Vec<Element>> {
        let Some(page) = self.page() else {
            return Ok(Vec::new());
        };

        if selector == PRODUCTS {
            let shown = self.revealed.min(page.batches.len());
            return Ok(page.batches[..shown].concat());
        }

        Ok(page.elements.get(selector).cloned().unwrap_or_default())
    }

    async fn wait_until_clickable(&mut self, selector: &str, budget: Duration) -> Result<Element> {
        let clickable = self.page().is_some_and(|page| {
            page.control.as_deref() == Some(selector)
                && (page.sticky_control || self.revealed < page.batches.len())
        });

        if clickable {
            Ok(Element::new("Load more"))
        } else {
            Err(CrawlError::Timeout {
                selector: selector.to_string(),
                budget_ms: budget.as_millis() as u64,
            })
        }
    }

    async fn click(&mut self, _control: &Element) -> Result<()> {
        self.log.lock().unwrap().clicks += 1;
        let total = self.page().map_or(0, |p| p.batches.len());
        self.revealed = (self.revealed + 1).min(total.max(1));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Image store that records requests and fails for chosen URLs.
#[derive(Default)]
pub struct FakeImageStore {
    failing: HashSet<String>,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl FakeImageStore {
    pub fn failing(url: &str) -> Self {
        Self { failing: [url.to_string()].into_iter().collect(), ..Self::default() }
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn download(&self, url: &str, hint: &str) -> Result<PathBuf> {
        let mut requests = self.requests.lock().unwrap();
        requests.push((url.to_string(), hint.to_string()));
        if self.failing.contains(url) {
            return Err(CrawlError::download(url, "status 500"));
        }
        Ok(PathBuf::from(format!("images/{}_{}.jpg", hint, requests.len())))
    }
}

/// A navbar item linking to `url`.
pub fn nav(label: &str, url: &str) -> Element {
    Element::new(label).with_link(url)
}

/// Validated site config using the fake selectors.
pub fn site(name: &str, base_url: &str) -> SelectorConfig {
    SiteConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        navbar_item: Some(NAVBAR.to_string()),
        product_list: Some(PRODUCTS.to_string()),
        load_more: Some(LOAD_MORE.to_string()),
        ..SiteConfig::default()
    }
    .validate()
    .unwrap()
}

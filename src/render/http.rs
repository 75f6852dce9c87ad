//! Static HTTP rendering backend using wreq for TLS fingerprint emulation.
//!
//! Pages are fetched once and parsed with `scraper`. A load-more control that
//! carries an `href` is emulated by fetching that target and appending it to
//! the session's view, so queries see the listing grow the way a rendered page
//! does after a click.

use crate::config::Config;
use crate::error::{CrawlError, Result};
use crate::render::{Element, Renderer, Session};
use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;
use wreq::Client;
use wreq_util::Emulation;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Attributes whose values are resolved against the page URL.
const URL_ATTRS: [&str; 2] = ["href", "src"];

/// Renderer that fetches server-rendered HTML over HTTP.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl HttpRenderer {
    /// Creates a renderer with the given configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { client, delay_ms: config.delay_ms, delay_jitter_ms: config.delay_jitter_ms })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn Session>> {
        let mut session = HttpSession {
            client: self.client.clone(),
            delay_ms: self.delay_ms,
            delay_jitter_ms: self.delay_jitter_ms,
            current_url: url.to_string(),
            pages: Vec::new(),
            loaded: HashSet::new(),
        };
        session.navigate(url).await?;
        Ok(Box::new(session))
    }
}

/// A fetched document and the URL it was served from.
struct LoadedPage {
    url: Url,
    html: String,
}

/// Session over one or more fetched documents.
pub struct HttpSession {
    client: Client,
    delay_ms: u64,
    delay_jitter_ms: u64,
    current_url: String,
    pages: Vec<LoadedPage>,
    loaded: HashSet<String>,
}

impl HttpSession {
    /// Performs a GET request and returns the final URL and body.
    async fn fetch(&self, url: &str) -> Result<LoadedPage> {
        self.delay().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| CrawlError::navigation(url, e))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 503 || status == 429 {
            warn!("Rate limited ({}). Consider increasing --delay.", status);
        }

        if !status.is_success() {
            return Err(CrawlError::navigation(url, format!("status {}", status)));
        }

        let final_url = response.uri().to_string();
        let url = Url::parse(&final_url).map_err(|e| CrawlError::navigation(url, e))?;
        let html = response.text().await.map_err(|e| CrawlError::navigation(url.as_str(), e))?;

        Ok(LoadedPage { url, html })
    }

    /// Adds the configured inter-request delay.
    async fn delay(&self) {
        if self.delay_ms == 0 && self.delay_jitter_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        trace!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.fetch(url).await?;

        self.loaded.clear();
        self.loaded.insert(url.to_string());
        self.loaded.insert(page.url.to_string());
        self.current_url = page.url.to_string();
        self.pages = vec![page];
        Ok(())
    }

    fn current_url(&self) -> String {
        self.current_url.clone()
    }

    async fn query(&self, selector: &str) -> Result<Vec<Element>> {
        select_all(&self.pages, selector)
    }

    async fn wait_until_clickable(&mut self, selector: &str, budget: Duration) -> Result<Element> {
        // A fetched document never changes, so there is nothing to wait for.
        // Only the most recently appended page can carry a live control.
        let latest = self.pages.len().saturating_sub(1);
        select_all(&self.pages[latest..], selector)?
            .pop()
            .filter(Element::is_enabled)
            .ok_or_else(|| CrawlError::Timeout {
                selector: selector.to_string(),
                budget_ms: budget.as_millis() as u64,
            })
    }

    async fn click(&mut self, control: &Element) -> Result<()> {
        let Some(target) = control.link().map(str::to_string) else {
            debug!("Control has no target, nothing to load");
            return Ok(());
        };

        if self.loaded.contains(&target) {
            debug!("Control target already loaded: {}", target);
            return Ok(());
        }

        let page = self.fetch(&target).await?;
        self.loaded.insert(target);
        self.loaded.insert(page.url.to_string());
        self.pages.push(page);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        trace!("Closing session at {}", self.current_url);
        self.pages.clear();
        self.loaded.clear();
        Ok(())
    }
}

/// Runs a selector over every loaded document, in load order.
fn select_all(pages: &[LoadedPage], selector: &str) -> Result<Vec<Element>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| CrawlError::Config(format!("invalid selector '{}': {}", selector, e)))?;

    let mut elements = Vec::new();
    for page in pages {
        let document = Html::parse_document(&page.html);
        elements.extend(document.select(&parsed).map(|e| snapshot(e, &page.url)));
    }
    Ok(elements)
}

/// Copies an element's text and attributes out of the parsed tree.
fn snapshot(element: ElementRef, base: &Url) -> Element {
    let attributes: HashMap<String, String> = element
        .value()
        .attrs()
        .map(|(name, value)| {
            let value =
                if URL_ATTRS.contains(&name) { resolve(base, value) } else { value.to_string() };
            (name.to_string(), value)
        })
        .collect();

    let link = attributes.get("href").cloned().or_else(|| {
        element.select(&ANCHOR).next().and_then(|a| a.value().attr("href")).map(|h| resolve(base, h))
    });

    let mut snapshot = Element::new(element.text().collect::<String>());
    for (name, value) in attributes {
        snapshot = snapshot.with_attr(name, value);
    }
    if let Some(link) = link {
        snapshot = snapshot.with_link(link);
    }
    snapshot
}

fn resolve(base: &Url, value: &str) -> String {
    base.join(value.trim()).map(String::from).unwrap_or_else(|_| value.to_string())
}

//! Traversal engine: navbar categories, then pagination, then product pages.
//!
//! Failures are contained at the narrowest loop that issued them. A product
//! that cannot be opened is skipped, a category that cannot be listed is
//! skipped, and a site whose home page or navbar is unusable yields an empty
//! result. None of these abort a multi-site run.

use crate::config::Config;
use crate::error::CrawlError;
use crate::images::ImageStore;
use crate::render::{Renderer, Session};
use crate::site::extractor::Extractor;
use crate::site::models::{NavLink, ProductRecord, SiteCrawl};
use crate::site::navbar;
use crate::site::paginator::{Paginator, DEFAULT_WAIT_BUDGET};
use crate::site::selectors::SelectorConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives crawl progress events.
///
/// All methods default to no-ops.
pub trait CrawlObserver: Send + Sync {
    fn site_started(&self, _site: &str, _url: &str) {}
    fn categories_found(&self, _site: &str, _links: &[NavLink]) {}
    fn products_found(&self, _category: &NavLink, _listed: usize, _new: usize) {}
    fn product_extracted(&self, _record: &ProductRecord) {}
    fn product_failed(&self, _url: &str, _error: &CrawlError) {}
    fn category_failed(&self, _category: &NavLink, _error: &CrawlError) {}
    fn site_failed(&self, _site: &str, _reason: &str) {}
    fn site_finished(&self, _crawl: &SiteCrawl) {}
}

/// Observer that writes events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn site_started(&self, site: &str, url: &str) {
        info!("Crawling {} ({})", site, url);
    }

    fn categories_found(&self, site: &str, links: &[NavLink]) {
        info!("{}: {} categories", site, links.len());
    }

    fn products_found(&self, category: &NavLink, listed: usize, new: usize) {
        info!("Category '{}': {} products listed, {} new", category.label, listed, new);
    }

    fn product_extracted(&self, record: &ProductRecord) {
        debug!("Extracted '{}' from {}", record.name, record.source_url);
    }

    fn product_failed(&self, url: &str, error: &CrawlError) {
        warn!("Skipping product {}: {}", url, error);
    }

    fn category_failed(&self, category: &NavLink, error: &CrawlError) {
        warn!("Skipping category '{}' ({}): {}", category.label, category.url, error);
    }

    fn site_failed(&self, site: &str, reason: &str) {
        warn!("Site {} yielded no products: {}", site, reason);
    }

    fn site_finished(&self, crawl: &SiteCrawl) {
        info!(
            "Finished {}: {} products, {} failed products, {} failed categories",
            crawl.site,
            crawl.count(),
            crawl.products_failed,
            crawl.categories_failed
        );
    }
}

/// Timing knobs for a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Wait budget for the load-more control
    pub wait_budget: Duration,
    /// Pause after each load-more click
    pub settle: Duration,
    /// Optional cap on load-more clicks per category
    pub max_load_more: Option<u32>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self { wait_budget: DEFAULT_WAIT_BUDGET, settle: Duration::ZERO, max_load_more: None }
    }
}

impl CrawlSettings {
    /// Reads the pagination settings from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_budget: Duration::from_millis(config.load_more_timeout_ms),
            settle: Duration::from_millis(config.settle_ms),
            max_load_more: config.max_load_more,
        }
    }
}

/// Crawls sites through an injected renderer.
#[derive(Clone)]
pub struct Crawler {
    renderer: Arc<dyn Renderer>,
    images: Option<Arc<dyn ImageStore>>,
    observer: Arc<dyn CrawlObserver>,
    settings: CrawlSettings,
}

impl Crawler {
    /// Creates a crawler that logs through `tracing` and skips image downloads.
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            images: None,
            observer: Arc::new(TracingObserver),
            settings: CrawlSettings::default(),
        }
    }

    /// Downloads product images into `store`.
    pub fn with_images(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.images = Some(store);
        self
    }

    /// Replaces the progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the timing settings.
    pub fn with_settings(mut self, settings: CrawlSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Crawls one site. Never fails; see [`SiteCrawl::failure`].
    pub async fn crawl(&self, config: &SelectorConfig) -> SiteCrawl {
        let mut crawl = SiteCrawl::new(&config.name);
        self.observer.site_started(&config.name, &config.base_url);

        let mut session = match self.renderer.open(&config.base_url).await {
            Ok(session) => session,
            Err(e) => {
                self.fail_site(&mut crawl, e.to_string());
                return crawl;
            }
        };

        self.crawl_session(config, session.as_mut(), &mut crawl).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close session for {}: {}", config.name, e);
        }

        self.observer.site_finished(&crawl);
        crawl
    }

    /// Crawls several sites, each with its own session and dedup set.
    ///
    /// Results keep the order of `sites`.
    pub async fn crawl_all(&self, sites: &[SelectorConfig], parallel: bool) -> Vec<SiteCrawl> {
        if !parallel {
            let mut results = Vec::with_capacity(sites.len());
            for site in sites {
                results.push(self.crawl(site).await);
            }
            return results;
        }

        let handles: Vec<_> = sites
            .iter()
            .cloned()
            .map(|site| {
                let crawler = self.clone();
                tokio::spawn(async move { crawler.crawl(&site).await })
            })
            .collect();

        let mut results = Vec::with_capacity(sites.len());
        for (site, handle) in sites.iter().zip(handles) {
            match handle.await {
                Ok(crawl) => results.push(crawl),
                Err(e) => {
                    let mut crawl = SiteCrawl::new(&site.name);
                    self.fail_site(&mut crawl, format!("crawl task failed: {}", e));
                    results.push(crawl);
                }
            }
        }
        results
    }

    async fn crawl_session(
        &self,
        config: &SelectorConfig,
        session: &mut dyn Session,
        crawl: &mut SiteCrawl,
    ) {
        let categories = match navbar::discover(session, config).await {
            Ok(links) if links.is_empty() => {
                self.fail_site(crawl, "no navbar links found".to_string());
                return;
            }
            Ok(links) => links,
            Err(e) => {
                self.fail_site(crawl, format!("navbar discovery failed: {}", e));
                return;
            }
        };
        self.observer.categories_found(&config.name, &categories);

        let mut extractor = Extractor::new(config);
        if let Some(store) = self.images.as_deref() {
            extractor = extractor.with_images(store);
        }

        let mut visited: HashSet<String> = HashSet::new();

        for category in &categories {
            let listed = match self.list_category(config, session, category).await {
                Ok(links) => links,
                Err(e) => {
                    crawl.categories_failed += 1;
                    self.observer.category_failed(category, &e);
                    continue;
                }
            };
            crawl.categories_visited += 1;

            let fresh: Vec<String> =
                listed.iter().filter(|url| !visited.contains(*url)).cloned().collect();
            self.observer.products_found(category, listed.len(), fresh.len());

            for url in fresh {
                // Marked before the visit, so a failed product is not retried.
                if !visited.insert(url.clone()) {
                    continue;
                }

                if let Err(e) = session.navigate(&url).await {
                    crawl.products_failed += 1;
                    self.observer.product_failed(&url, &e);
                    continue;
                }

                let record = extractor.extract(session, Some(category)).await;
                self.observer.product_extracted(&record);
                crawl.records.push(record);
            }
        }
    }

    async fn list_category(
        &self,
        config: &SelectorConfig,
        session: &mut dyn Session,
        category: &NavLink,
    ) -> Result<Vec<String>, CrawlError> {
        session.navigate(&category.url).await?;

        Paginator::new(config)
            .wait_budget(self.settings.wait_budget)
            .settle(self.settings.settle)
            .max_rounds(self.settings.max_load_more)
            .collect(session)
            .await
    }

    fn fail_site(&self, crawl: &mut SiteCrawl, reason: String) {
        self.observer.site_failed(&crawl.site, &reason);
        crawl.failure = Some(reason);
    }
}

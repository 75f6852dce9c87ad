//! Crawl command implementation.

use crate::config::Config;
use crate::export::Exporter;
use crate::images::HttpImageStore;
use crate::render::HttpRenderer;
use crate::site::crawler::{CrawlSettings, Crawler};
use crate::site::models::SiteCrawl;
use crate::site::selectors::SelectorConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Crawls configured sites and writes one output file per site.
pub struct CrawlCommand {
    config: Config,
}

impl CrawlCommand {
    /// Creates a new crawl command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Crawls the named sites (all sites when `names` is empty) and returns a
    /// summary table.
    ///
    /// Every requested site is validated before the first request is made.
    pub async fn execute(&self, names: &[String], parallel: bool) -> Result<String> {
        let sites = self.config.select_sites(names)?;

        let renderer = HttpRenderer::new(&self.config).context("Failed to create HTTP client")?;
        let mut crawler = Crawler::new(Arc::new(renderer))
            .with_settings(CrawlSettings::from_config(&self.config));

        if self.config.download_images {
            let store = HttpImageStore::new(&self.config).context("Failed to create image client")?;
            crawler = crawler.with_images(Arc::new(store));
        }

        self.execute_with_crawler(&crawler, &sites, parallel).await
    }

    /// Crawls with a provided crawler (for testing).
    pub async fn execute_with_crawler(
        &self,
        crawler: &Crawler,
        sites: &[SelectorConfig],
        parallel: bool,
    ) -> Result<String> {
        if sites.is_empty() {
            anyhow::bail!("No sites configured. Add [[sites]] entries to crawler.toml");
        }

        info!("Crawling {} site(s)", sites.len());
        let crawls = crawler.crawl_all(sites, parallel).await;

        let exporter = Exporter::new(self.config.schema, self.config.format);
        let mut lines = Vec::new();

        lines.push(format!("{:<24} {:>8} {:>8} {:>10}  {}", "Site", "Products", "Failed", "Categories", "Output"));
        lines.push(format!("{:-<24} {:->8} {:->8} {:->10}  {:-<30}", "", "", "", "", ""));

        for (site, crawl) in sites.iter().zip(&crawls) {
            let output = self.save(&exporter, site, crawl);
            lines.push(format!(
                "{:<24} {:>8} {:>8} {:>10}  {}",
                site.name,
                crawl.count(),
                crawl.products_failed,
                crawl.categories_visited,
                output
            ));
        }

        let total: usize = crawls.iter().map(SiteCrawl::count).sum();
        lines.push(String::new());
        lines.push(format!("Total: {} products from {} site(s)", total, crawls.len()));

        Ok(lines.join("\n"))
    }

    fn save(&self, exporter: &Exporter, site: &SelectorConfig, crawl: &SiteCrawl) -> String {
        if let Some(failure) = &crawl.failure {
            return format!("failed: {}", failure);
        }

        match exporter.save(&self.config.output_dir, &site.slug(), &site.name, &crawl.records) {
            Ok(Some(path)) => path.display().to_string(),
            Ok(None) => "no products".to_string(),
            Err(e) => {
                warn!("Failed to write output for {}: {}", site.name, e);
                format!("write failed: {}", e)
            }
        }
    }
}

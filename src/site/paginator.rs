//! Load-more pagination on a category listing page.

use crate::error::Result;
use crate::render::Session;
use crate::site::selectors::SelectorConfig;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default wait budget for the load-more control.
pub const DEFAULT_WAIT_BUDGET: Duration = Duration::from_secs(10);

/// Drives the load-more control until the listing stops growing.
///
/// The loop ends when the control is missing or disabled within the wait
/// budget (last page reached), or when the control is present but the
/// number of listed products did not change since the previous click.
pub struct Paginator<'a> {
    product_list: &'a str,
    load_more: Option<&'a str>,
    wait_budget: Duration,
    settle: Duration,
    max_rounds: Option<u32>,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator using the site's listing selectors.
    pub fn new(config: &'a SelectorConfig) -> Self {
        Self {
            product_list: &config.product_list,
            load_more: config.load_more.as_deref(),
            wait_budget: DEFAULT_WAIT_BUDGET,
            settle: Duration::ZERO,
            max_rounds: None,
        }
    }

    /// How long to wait for the control to become clickable.
    pub fn wait_budget(mut self, budget: Duration) -> Self {
        self.wait_budget = budget;
        self
    }

    /// Pause after each click so new content can render.
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Optional cap on the number of clicks.
    pub fn max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Returns every product link visible when the loop exits, in discovery
    /// order and without duplicates.
    pub async fn collect(&self, session: &mut dyn Session) -> Result<Vec<String>> {
        let mut previous_count = 0usize;
        let mut rounds = 0u32;

        loop {
            let (count, links) = self.links(session).await?;
            trace!("Listing shows {} products ({} unique links)", count, links.len());

            let Some(control) = self.load_more else {
                return Ok(links);
            };

            if self.max_rounds.is_some_and(|max| rounds >= max) {
                debug!("Reached load-more cap of {} clicks", rounds);
                return Ok(links);
            }

            let button = match session.wait_until_clickable(control, self.wait_budget).await {
                Ok(button) => button,
                Err(e) if e.is_timeout() => {
                    debug!("Load-more control gone after {} clicks, last page reached", rounds);
                    return Ok(links);
                }
                Err(e) => {
                    warn!("Load-more lookup failed at {}: {}", session.current_url(), e);
                    return Ok(links);
                }
            };

            if count == previous_count {
                debug!("Load-more produced no new products, stopping after {} clicks", rounds);
                return Ok(links);
            }

            if let Err(e) = session.click(&button).await {
                warn!("Load-more click failed at {}: {}", session.current_url(), e);
                return Ok(links);
            }

            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }

            previous_count = count;
            rounds += 1;
        }
    }

    /// Counts product elements and collects their distinct links.
    async fn links(&self, session: &dyn Session) -> Result<(usize, Vec<String>)> {
        let elements = session.query(self.product_list).await?;
        let mut seen = HashSet::new();
        let links = elements
            .iter()
            .filter_map(|e| e.link())
            .filter(|link| seen.insert(link.to_string()))
            .map(String::from)
            .collect();
        Ok((elements.len(), links))
    }
}

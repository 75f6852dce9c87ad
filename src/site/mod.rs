//! Site crawling: selector configuration, navbar discovery, pagination,
//! extraction, and the traversal engine that ties them together.

pub mod crawler;
pub mod extractor;
pub mod models;
pub mod navbar;
pub mod paginator;
pub mod selectors;

pub use crawler::{CrawlObserver, CrawlSettings, Crawler, TracingObserver};
pub use extractor::Extractor;
pub use models::{NavLink, ProductRecord, SiteCrawl, NOT_AVAILABLE};
pub use paginator::Paginator;
pub use selectors::{CategorySource, Field, FieldSelector, FieldSelectors, SelectorConfig, SiteConfig};

//! catalog-crawler - Navbar-driven e-commerce catalog crawler
//!
//! Walks a shop's category navigation, exhausts each listing's load-more
//! control, visits every product page once, and exports flat product records.

pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod images;
pub mod render;
pub mod site;

pub use config::Config;
pub use error::CrawlError;
pub use render::{Element, Renderer, Session};
pub use site::{Crawler, NavLink, ProductRecord, SelectorConfig, SiteCrawl};

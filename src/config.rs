//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::error::Result as CrawlResult;
use crate::site::selectors::{SelectorConfig, SiteConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file name looked up in the working and XDG config directories.
pub const CONFIG_FILE: &str = "crawler.toml";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between requests in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default)]
    pub delay_jitter_ms: u64,

    /// Pause after each load-more click in milliseconds
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Wait budget for the load-more control in milliseconds
    #[serde(default = "default_load_more_timeout_ms")]
    pub load_more_timeout_ms: u64,

    /// Optional cap on load-more clicks per category
    #[serde(default)]
    pub max_load_more: Option<u32>,

    /// Download product images
    #[serde(default = "default_download_images")]
    pub download_images: bool,

    /// Root directory for per-site output files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for downloaded images
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Column layout of the output file
    #[serde(default)]
    pub schema: Schema,

    /// Output file format
    #[serde(default)]
    pub format: OutputFormat,

    /// Configured sites
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_load_more_timeout_ms() -> u64 {
    10_000
}

fn default_download_images() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data").join("raw_data")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("data").join("product_images")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: 0,
            settle_ms: default_settle_ms(),
            load_more_timeout_ms: default_load_more_timeout_ms(),
            max_load_more: None,
            download_images: default_download_images(),
            output_dir: default_output_dir(),
            image_dir: default_image_dir(),
            schema: Schema::default(),
            format: OutputFormat::default(),
            sites: Vec::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new(CONFIG_FILE);
        if local_config.exists() {
            debug!("Found {} in current directory", CONFIG_FILE);
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("catalog-crawler").join(CONFIG_FILE);
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("CRAWL_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("CRAWL_DELAY") {
            match delay.trim().parse() {
                Ok(d) => self.delay_ms = d,
                Err(_) => warn!("Ignoring CRAWL_DELAY={:?}: not a number of milliseconds", delay),
            }
        }

        if let Ok(dir) = std::env::var("CRAWL_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }

        self
    }

    /// Names of the configured sites, in file order.
    pub fn site_names(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.name.as_str()).collect()
    }

    /// Validates the named sites, or every site when `names` is empty.
    ///
    /// Any invalid or unknown site fails the whole selection.
    pub fn select_sites(&self, names: &[String]) -> CrawlResult<Vec<SelectorConfig>> {
        if names.is_empty() {
            return self.sites.iter().map(SiteConfig::validate).collect();
        }

        names
            .iter()
            .map(|name| {
                self.sites
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        crate::CrawlError::Config(format!(
                            "unknown site '{}'. Known sites: {}",
                            name,
                            self.site_names().join(", ")
                        ))
                    })
                    .and_then(SiteConfig::validate)
            })
            .collect()
    }
}

/// Column layout for tabular output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// Website, Name, Price, Category, Sub-Category, Image URL, Image Path,
    /// Short Description, Long Description
    #[default]
    Catalog,
    /// name, sku, category, short_description, long_description, image_url,
    /// price, product_url
    Product,
}

impl std::str::FromStr for Schema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "catalog" => Ok(Schema::Catalog),
            "product" => Ok(Schema::Product),
            _ => Err(format!("Unknown schema: {}. Use: catalog, product", s)),
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schema::Catalog => write!(f, "catalog"),
            Schema::Product => write!(f, "product"),
        }
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: csv, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::selectors::CategorySource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SITES_TOML: &str = r#"
        delay_ms = 500
        settle_ms = 1500
        schema = "product"

        [[sites]]
        name = "contipet.co.il"
        base_url = "https://www.contipet.co.il"
        navbar_item = "#menu-main li"
        product_list = "ul.products li.product a.woocommerce-LoopProduct-link"
        load_more = "a.load-more"
        category_source = "navbar"

        [sites.fields]
        name = "h1"
        price = ".price"
        image = "img.attachment-large"
        short_description = { css = "meta[property='og:description']", attr = "content" }

        [[sites]]
        name = "petshop.test"
        base_url = "https://petshop.test"
        navbar_item = "nav a"
    "#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.delay_jitter_ms, 0);
        assert_eq!(config.settle_ms, 2000);
        assert_eq!(config.load_more_timeout_ms, 10_000);
        assert!(config.max_load_more.is_none());
        assert!(config.download_images);
        assert_eq!(config.output_dir, PathBuf::from("data").join("raw_data"));
        assert_eq!(config.schema, Schema::Catalog);
        assert_eq!(config.format, OutputFormat::Csv);
        assert!(config.proxy.is_none());
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.delay_ms, 1000);
    }

    #[test]
    fn test_schema_parsing() {
        assert_eq!("catalog".parse::<Schema>().unwrap(), Schema::Catalog);
        assert_eq!("PRODUCT".parse::<Schema>().unwrap(), Schema::Product);
        let err = "wide".parse::<Schema>().unwrap_err();
        assert!(err.contains("catalog, product"));
        assert_eq!(Schema::Product.to_string(), "product");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_config_from_toml_with_sites() {
        let config: Config = toml::from_str(SITES_TOML).unwrap();
        assert_eq!(config.delay_ms, 500);
        assert_eq!(config.settle_ms, 1500);
        assert_eq!(config.schema, Schema::Product);
        assert_eq!(config.site_names(), vec!["contipet.co.il", "petshop.test"]);

        let site = &config.sites[0];
        assert_eq!(site.category_source, CategorySource::Navbar);
        assert_eq!(site.fields.short_description.as_ref().unwrap().attr(), Some("content"));
    }

    #[test]
    fn test_select_sites_by_name() {
        let config: Config = toml::from_str(SITES_TOML).unwrap();
        let selected = config.select_sites(&["CONTIPET.CO.IL".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].slug(), "contipet_co_il");
    }

    #[test]
    fn test_select_sites_fails_fast_on_invalid_site() {
        let config: Config = toml::from_str(SITES_TOML).unwrap();

        // petshop.test has no product_list selector.
        let err = config.select_sites(&[]).unwrap_err();
        assert!(err.to_string().contains("product_list"));

        let err = config.select_sites(&["nowhere".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown site"));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            delay_ms = 4000
            download_images = false
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.delay_ms, 4000);
        assert!(!config.download_images);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/crawler.toml");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let err = Config::from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "load_more_timeout_ms = 3000").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.load_more_timeout_ms, 3000);
    }

    #[test]
    fn test_config_with_env() {
        let orig_delay = std::env::var("CRAWL_DELAY").ok();
        let orig_dir = std::env::var("CRAWL_OUTPUT_DIR").ok();

        std::env::set_var("CRAWL_DELAY", "250");
        std::env::set_var("CRAWL_OUTPUT_DIR", "/tmp/crawl-out");

        let config = Config::new().with_env();
        assert_eq!(config.delay_ms, 250);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/crawl-out"));

        std::env::set_var("CRAWL_DELAY", "not_a_number");
        let config = Config::new().with_env();
        assert_eq!(config.delay_ms, 1000);

        match orig_delay {
            Some(v) => std::env::set_var("CRAWL_DELAY", v),
            None => std::env::remove_var("CRAWL_DELAY"),
        }
        match orig_dir {
            Some(v) => std::env::set_var("CRAWL_OUTPUT_DIR", v),
            None => std::env::remove_var("CRAWL_OUTPUT_DIR"),
        }
    }
}

//! catalog-crawler - Navbar-driven e-commerce catalog crawler
//!
//! Crawls the sites configured in crawler.toml and writes one products file per site.

use anyhow::Result;
use catalog_crawler::commands::CrawlCommand;
use catalog_crawler::config::{Config, OutputFormat, Schema};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-crawler",
    version,
    about = "Navbar-driven e-commerce catalog crawler",
    long_about = "Discovers category links, exhausts load-more pagination, extracts every product page once, and exports the records to CSV or JSON."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for output files (also CRAWL_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Delay between requests in milliseconds (also CRAWL_DELAY)
    #[arg(long, global = true)]
    delay: Option<u64>,

    /// Proxy URL, e.g. socks5://host:port (also CRAWL_PROXY)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Skip product image downloads
    #[arg(long, global = true)]
    no_images: bool,

    /// Output columns
    #[arg(long, global = true)]
    schema: Option<Schema>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one or more configured sites
    #[command(alias = "c")]
    Crawl {
        /// Site names to crawl
        #[arg(required_unless_present = "all")]
        sites: Vec<String>,

        /// Crawl every configured site
        #[arg(long, conflicts_with = "sites")]
        all: bool,

        /// Crawl sites concurrently, one session per site
        #[arg(long)]
        parallel: bool,
    },

    /// List configured sites
    Sites,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(schema) = cli.schema {
        config.schema = schema;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.no_images {
        config.download_images = false;
    }

    match cli.command {
        Commands::Crawl { sites, all: _, parallel } => {
            let cmd = CrawlCommand::new(config);
            let output = cmd.execute(&sites, parallel).await?;
            println!("{}", output);
        }

        Commands::Sites => {
            if config.sites.is_empty() {
                println!("No sites configured.");
                return Ok(());
            }

            println!("{:<24} {:<40} {:<10}", "Name", "Base URL", "Load more");
            println!("{:-<24} {:-<40} {:-<10}", "", "", "");

            for site in &config.sites {
                println!(
                    "{:<24} {:<40} {:<10}",
                    site.name,
                    site.base_url,
                    if site.load_more.is_some() { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}

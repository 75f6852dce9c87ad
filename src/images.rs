//! Product image downloads.

use crate::config::Config;
use crate::error::{CrawlError, Result};
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use wreq::Client;
use wreq_util::Emulation;

/// Longest file stem kept from a product name.
const MAX_STEM_CHARS: usize = 80;

/// Fetches an image and stores it locally.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Downloads `url`, naming the file after `hint`, and returns its path.
    ///
    /// Not idempotent: every call writes a new file.
    async fn download(&self, url: &str, hint: &str) -> Result<PathBuf>;
}

/// Image store backed by wreq and the local filesystem.
pub struct HttpImageStore {
    client: Client,
    dir: PathBuf,
    seq: AtomicU64,
}

impl HttpImageStore {
    /// Creates a store writing into `config.image_dir`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(60));

        if let Some(proxy_url) = &config.proxy {
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build image client")?;
        Ok(Self { client, dir: config.image_dir.clone(), seq: AtomicU64::new(0) })
    }

    fn file_name(&self, url: &str, hint: &str) -> String {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}_{}{}", sanitize(hint), millis, seq, extension(url))
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn download(&self, url: &str, hint: &str) -> Result<PathBuf> {
        debug!("Downloading image {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .send()
            .await
            .map_err(|e| CrawlError::download(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::download(url, format!("status {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| CrawlError::download(url, e))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| CrawlError::download(url, e))?;
        let path = self.dir.join(self.file_name(url, hint));
        tokio::fs::write(&path, &bytes).await.map_err(|e| CrawlError::download(url, e))?;

        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Replaces characters that are unsafe in file names.
fn sanitize(hint: &str) -> String {
    let mut out = String::new();
    for c in hint.trim().chars().take(MAX_STEM_CHARS) {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches('_');
    if out.is_empty() {
        "image".to_string()
    } else {
        out.to_string()
    }
}

/// Extension of the URL path, `.jpg` when there is none.
fn extension(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
                .map(|e| format!(".{}", e.to_ascii_lowercase()))
        })
        .unwrap_or_else(|| ".jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_store(dir: &Path) -> HttpImageStore {
        let config = Config { image_dir: dir.to_path_buf(), ..Config::default() };
        HttpImageStore::new(&config).unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("shop.test_Dry Food / 2kg"), "shop_test_Dry_Food_2kg");
        assert_eq!(sanitize("  "), "image");
        assert_eq!(sanitize("מזון_יבש"), "מזון_יבש");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("https://shop.test/img/photo.PNG"), ".png");
        assert_eq!(extension("https://shop.test/img/photo.webp?v=3"), ".webp");
        assert_eq!(extension("https://shop.test/img/photo"), ".jpg");
        assert_eq!(extension("not a url"), ".jpg");
    }

    #[tokio::test]
    async fn test_download_writes_distinct_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = make_store(&dir.path().join("images"));
        let url = format!("{}/img/photo.jpg", server.uri());

        let first = store.download(&url, "shop.test_Dry Food").await.unwrap();
        let second = store.download(&url, "shop.test_Dry Food").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), vec![0xFF, 0xD8, 0xFF]);
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("shop_test_Dry_Food_"));
        assert!(name.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = make_store(dir.path());
        let err = store.download(&format!("{}/img/gone.jpg", server.uri()), "x").await.unwrap_err();

        assert!(matches!(err, CrawlError::Download { .. }));
        assert!(err.to_string().contains("404"));
    }
}

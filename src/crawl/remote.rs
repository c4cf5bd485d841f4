//! Crawl hosted by the API
//!
//! The remote variant keeps only its configuration and id locally; progress
//! lives on the server. The crawl is created on the server lazily, the first
//! time it is queued.

use crate::api::ApiClient;
use crate::config::{validate_crawl_config, CrawlConfig};
use crate::output::{CrawlStatus, Location};
use crate::storage::page_file_name;
use crate::url::origin_of;
use crate::{ConfigError, WebtError};
use serde::Deserialize;
use serde_json::json;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay between status polls while waiting on the server
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CreateResponse {
    crawl_id: String,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UrlListResponse {
    #[serde(alias = "urls")]
    pages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteConfig {
    crawl_id: String,
    base_url: String,
    #[serde(default)]
    allowed_urls: Vec<String>,
    #[serde(default)]
    banned_urls: Vec<String>,
    max_pages: usize,
    #[serde(default)]
    render_js: bool,
}

/// A crawl that runs on the hosted API
#[derive(Debug, Clone)]
pub struct RemoteCrawl {
    api: ApiClient,
    crawl_id: Option<String>,
    config: CrawlConfig,
    poll_interval: Duration,
}

impl RemoteCrawl {
    /// Prepares a crawl; nothing is sent until it is queued or run
    pub fn new(config: CrawlConfig, api: ApiClient) -> Result<Self, WebtError> {
        validate_crawl_config(&config)?;
        Ok(Self {
            api,
            crawl_id: None,
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Attaches to a crawl that already exists on the server
    pub async fn from_cloud(crawl_id: &str, api: ApiClient) -> Result<Self, WebtError> {
        let remote: RemoteConfig = api
            .call("v1/crawl/get", &json!({ "crawl_id": crawl_id }))
            .await?;

        let mut config = CrawlConfig::new(remote.base_url)
            .with_allowed(remote.allowed_urls)
            .with_banned(remote.banned_urls)
            .with_max_pages(remote.max_pages)
            .with_render_js(remote.render_js);
        config.workers = 1;

        Ok(Self {
            api,
            crawl_id: Some(remote.crawl_id),
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Changes how often `run` polls the server
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Server-side id, once the crawl has been created
    pub fn crawl_id(&self) -> Option<&str> {
        self.crawl_id.as_deref()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn is_created(&self) -> bool {
        self.crawl_id.is_some()
    }

    fn require_id(&self) -> Result<&str, WebtError> {
        self.crawl_id.as_deref().ok_or(WebtError::NotCreated)
    }

    /// Creates the crawl on the server if it does not exist yet
    pub async fn create(&mut self) -> Result<&str, WebtError> {
        if self.crawl_id.is_none() {
            tracing::info!("Creating crawl of {} on the hosted API", self.config.url);
            let created: CreateResponse = self
                .api
                .call(
                    "v1/crawl/create",
                    &json!({
                        "url": self.config.url,
                        "render_js": self.config.render_js,
                        "max_pages": self.config.max_pages,
                        "allowed_urls": self.config.allowed_urls,
                        "banned_urls": self.config.banned_urls,
                    }),
                )
                .await?;
            self.crawl_id = Some(created.crawl_id);
        }
        self.require_id()
    }

    /// Starts or resumes the crawl on the server without waiting
    pub async fn queue(&mut self) -> Result<(), WebtError> {
        let crawl_id = self.create().await?.to_string();
        tracing::info!("Queueing crawl {} on the hosted API", crawl_id);
        let _: serde_json::Value = self
            .api
            .call("v1/crawl/resume", &json!({ "crawl_id": crawl_id }))
            .await?;
        Ok(())
    }

    /// Queues the crawl and polls until the server stops making progress
    ///
    /// # Errors
    ///
    /// * `WebtError::FirstPageFailed` - the server failed the start URL and
    ///   has nothing else to do
    pub async fn run(&mut self) -> Result<(), WebtError> {
        self.queue().await?;

        let mut status = self.status().await?;
        while status.is_idle() {
            if status.num_failed > 0 {
                return Err(WebtError::FirstPageFailed {
                    url: self.config.url.clone(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            status = self.status().await?;
        }

        while status.num_queued > 0 && status.num_visited < status.max_pages {
            tracing::debug!(
                "Crawl {}: {} visited, {} queued",
                status.crawl_id,
                status.num_visited,
                status.num_queued
            );
            tokio::time::sleep(self.poll_interval).await;
            status = self.status().await?;
        }

        tracing::info!(
            "Crawl {} finished with {} pages visited",
            status.crawl_id,
            status.num_visited
        );
        Ok(())
    }

    /// Status as reported by the server, or the local configuration if the
    /// crawl was never created
    pub async fn status(&self) -> Result<CrawlStatus, WebtError> {
        let Some(crawl_id) = self.crawl_id.as_deref() else {
            return Ok(CrawlStatus {
                crawl_id: String::new(),
                loc: Location::Cloud,
                base_url: self.config.url.clone(),
                max_pages: self.config.max_pages,
                num_queued: 1,
                banned_urls: self.config.banned_urls.clone(),
                allowed_urls: self.config.allowed_urls.clone(),
                ..CrawlStatus::default()
            });
        };

        let mut status: CrawlStatus = self
            .api
            .call("v1/crawl/get", &json!({ "crawl_id": crawl_id }))
            .await?;
        status.loc = Location::Cloud;
        Ok(status)
    }

    /// The first `n` queued URLs on the server
    pub async fn queued(&self, n: usize) -> Result<Vec<String>, WebtError> {
        let Some(crawl_id) = self.crawl_id.as_deref() else {
            return Ok(vec![self.config.url.clone()]);
        };
        let answer: UrlListResponse = self
            .api
            .call("v1/crawl/get-queue", &json!({ "crawl_id": crawl_id, "max_pages": n }))
            .await?;
        Ok(answer.pages)
    }

    async fn url_list(&self, path: &str) -> Result<Vec<String>, WebtError> {
        let crawl_id = self.require_id()?;
        let answer: UrlListResponse = self.api.call(path, &json!({ "crawl_id": crawl_id })).await?;
        Ok(answer.pages)
    }

    pub async fn visited_urls(&self) -> Result<Vec<String>, WebtError> {
        self.url_list("v1/crawl/get/visited").await
    }

    pub async fn ignored_urls(&self) -> Result<Vec<String>, WebtError> {
        self.url_list("v1/crawl/get/ignored").await
    }

    pub async fn failed_urls(&self) -> Result<Vec<String>, WebtError> {
        self.url_list("v1/crawl/get/failed").await
    }

    /// Fetches a page record from the server
    pub async fn page(&self, url: &str) -> Result<serde_json::Value, WebtError> {
        let crawl_id = self.require_id()?;
        self.api
            .call("v1/crawl/get-page", &json!({ "crawl_id": crawl_id, "url": url }))
            .await
    }

    /// Asks the server to re-queue its failed URLs
    pub async fn retry_failed(&self) -> Result<(), WebtError> {
        let crawl_id = self.require_id()?;
        let _: serde_json::Value = self
            .api
            .call("v1/crawl/retry-failed", &json!({ "crawl_id": crawl_id }))
            .await?;
        Ok(())
    }

    pub async fn set_allowed(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        self.update("v1/crawl/set-allowed", "allowed_urls", json!(patterns))
            .await?;
        self.config.allowed_urls = patterns;
        Ok(())
    }

    pub async fn set_banned(&mut self, patterns: Vec<String>) -> Result<(), WebtError> {
        self.update("v1/crawl/set-banned", "banned_urls", json!(patterns))
            .await?;
        self.config.banned_urls = patterns;
        Ok(())
    }

    pub async fn set_max_pages(&mut self, max_pages: usize) -> Result<(), WebtError> {
        self.update("v1/crawl/set-max-pages", "max_pages", json!(max_pages))
            .await?;
        self.config.max_pages = max_pages;
        Ok(())
    }

    /// Sends a setting to the server; before creation it only applies locally
    async fn update(
        &self,
        path: &str,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), WebtError> {
        let Some(crawl_id) = self.crawl_id.as_deref() else {
            return Ok(());
        };
        let mut body = json!({ "crawl_id": crawl_id });
        body[field] = value;
        let _: serde_json::Value = self.api.call(path, &body).await?;
        Ok(())
    }

    /// Downloads the crawl archive and unpacks its page records
    ///
    /// Records land where a local crawl of the same base URL would write
    /// them, `<output_dir>/<origin>/<page file name>`, so they can be read
    /// back with `read_page_record`. Returns the output directory.
    pub async fn download(&self) -> Result<PathBuf, WebtError> {
        let crawl_id = self.require_id()?;
        tracing::info!("Downloading crawl of {}", self.config.url);
        let answer: DownloadResponse = self
            .api
            .call("v1/crawl/download", &json!({ "crawl_id": crawl_id }))
            .await?;

        let bytes = self.api.fetch_bytes(&answer.url).await?;
        let origin = origin_of(&self.config.url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Cannot determine origin of '{}'", self.config.url))
        })?;
        let count = unpack_pages(&bytes, &self.config.output_dir.join(origin))?;
        tracing::debug!("Unpacked {} page records for crawl {}", count, crawl_id);

        tracing::info!(
            "The output of the crawl can be found at: {}",
            self.config.output_dir.display()
        );
        Ok(self.config.output_dir.clone())
    }
}

/// Writes every page record in a zip archive into `page_dir`
///
/// Entries that are not JSON objects with a string `url` are skipped.
/// Returns the number of records written.
fn unpack_pages(archive_bytes: &[u8], page_dir: &Path) -> Result<usize, WebtError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().ends_with(".json") {
            continue;
        }

        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;

        let record: serde_json::Value = match serde_json::from_slice(&content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping archive entry {}: {}", entry.name(), e);
                continue;
            }
        };
        let Some(url) = record.get("url").and_then(|u| u.as_str()) else {
            tracing::debug!("Skipping archive entry {}: no page URL", entry.name());
            continue;
        };

        std::fs::create_dir_all(page_dir)?;
        std::fs::write(page_dir.join(page_file_name(url)), &content)?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_create() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"crawl_id": "remote-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl/resume"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        server
    }

    fn remote(server: &MockServer) -> RemoteCrawl {
        let api = ApiClient::with_base_url("key", &server.uri()).unwrap();
        RemoteCrawl::new(CrawlConfig::new("http://a.com/").with_max_pages(10), api)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_status_before_create() {
        let server = MockServer::start().await;
        let crawl = remote(&server);

        let status = crawl.status().await.unwrap();
        assert_eq!(status.loc, Location::Cloud);
        assert_eq!(status.num_queued, 1);
        assert!(!crawl.is_created());
        assert_eq!(crawl.queued(5).await.unwrap(), vec!["http://a.com/"]);
    }

    #[tokio::test]
    async fn test_run_polls_until_done() {
        let server = server_with_create().await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "crawl_id": "remote-1", "base_url": "http://a.com/", "max_pages": 10,
                "num_visited": 10, "num_queued": 4, "num_ignored": 0, "num_failed": 0
            })))
            .mount(&server)
            .await;

        let mut crawl = remote(&server);
        crawl.run().await.unwrap();
        assert_eq!(crawl.crawl_id(), Some("remote-1"));
    }

    #[tokio::test]
    async fn test_run_reports_first_page_failure() {
        let server = server_with_create().await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "crawl_id": "remote-1", "base_url": "http://a.com/", "max_pages": 10,
                "num_visited": 0, "num_queued": 0, "num_ignored": 0, "num_failed": 1
            })))
            .mount(&server)
            .await;

        let mut crawl = remote(&server);
        let result = crawl.run().await;
        assert!(matches!(result, Err(WebtError::FirstPageFailed { .. })));
    }

    #[tokio::test]
    async fn test_setter_sends_update_once_created() {
        let server = server_with_create().await;
        Mock::given(method("POST"))
            .and(path("/v1/crawl/set-max-pages"))
            .and(body_partial_json(json!({"crawl_id": "remote-1", "max_pages": 50})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut crawl = remote(&server);
        crawl.set_max_pages(20).await.unwrap();
        assert_eq!(crawl.config().max_pages, 20);

        crawl.create().await.unwrap();
        crawl.set_max_pages(50).await.unwrap();
        assert_eq!(crawl.config().max_pages, 50);
    }

    #[tokio::test]
    async fn test_url_lists_require_creation() {
        let server = MockServer::start().await;
        let crawl = remote(&server);
        assert!(matches!(
            crawl.visited_urls().await,
            Err(WebtError::NotCreated)
        ));
    }

    fn zip_of(entries: &[(&str, String)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut writer, content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_download_unpacks_pages_into_local_layout() {
        let server = server_with_create().await;
        let dir = tempfile::TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/v1/crawl/download"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": format!("{}/archive.zip", server.uri())
            })))
            .mount(&server)
            .await;
        let page = json!({"url": "http://a.com/docs", "type": "html", "title": "Docs"}).to_string();
        let archive = zip_of(&[
            ("remote-1/pages/0.json", page.clone()),
            ("remote-1/meta.json", json!({"crawl_id": "remote-1"}).to_string()),
            ("remote-1/readme.txt", "not a page".to_string()),
        ]);
        Mock::given(method("GET"))
            .and(path("/archive.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url("key", &server.uri()).unwrap();
        let config = CrawlConfig::new("http://a.com/").with_output_dir(dir.path());
        let mut crawl = RemoteCrawl::new(config, api).unwrap();
        crawl.create().await.unwrap();

        let out = crawl.download().await.unwrap();
        assert_eq!(out, dir.path());

        let record_path = dir.path().join("a.com").join(page_file_name("http://a.com/docs"));
        assert_eq!(std::fs::read_to_string(&record_path).unwrap(), page);
        assert_eq!(std::fs::read_dir(dir.path().join("a.com")).unwrap().count(), 1);
        assert!(!dir.path().join("remote-1.zip").exists());
    }

    #[test]
    fn test_unpack_rejects_non_zip() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = unpack_pages(b"PK\x03\x04", dir.path());
        assert!(matches!(result, Err(WebtError::Archive(_))));
    }
}

//! Integration tests for the local crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawl
//! passes end-to-end, checking the resulting state, page records and sidecar.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use webtranspose::config::CrawlConfig;
use webtranspose::state::{CrawlState, FrontierItem, PageType};
use webtranspose::storage::{page_file_name, save_sidecar, Sidecar};
use webtranspose::url::origin_of;
use webtranspose::{LocalCrawl, WebtError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        title, title, anchors
    );
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(title, links))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer, dir: &TempDir) -> CrawlConfig {
    CrawlConfig::new(format!("{}/", server.uri()))
        .with_output_dir(dir.path())
        .with_timeout_secs(5)
}

/// Asserts that visited, failed and ignored share no URL
fn assert_partition(state: &CrawlState) {
    let visited: BTreeSet<&String> = state.visited.keys().collect();
    assert!(visited.iter().all(|url| !state.failed.contains(*url)));
    assert!(visited.iter().all(|url| !state.ignored.contains(*url)));
    assert!(state.failed.is_disjoint(&state.ignored));
}

#[tokio::test]
async fn test_max_pages_leaves_leftover_queue() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/", "Home", &["/a", "/b", "/c"]).await;
    for route in ["/a", "/b", "/c"] {
        mount_page(&server, route, route, &[]).await;
    }

    let config = config_for(&server, &dir).with_max_pages(2).with_workers(1);
    let crawl = LocalCrawl::with_id("small", config).unwrap();
    crawl.run().await.unwrap();

    let state = crawl.state();
    let visited: Vec<String> = state.visited.keys().cloned().collect();
    assert_eq!(visited, vec![base.clone(), format!("{}a", base)]);

    let queued: Vec<String> = crawl.queued(10).into_iter().map(|item| item.url).collect();
    assert_eq!(queued, vec![format!("{}b", base), format!("{}c", base)]);
    assert!(state.ignored.is_empty());
    assert!(state.failed.is_empty());
    assert_partition(&state);

    let status = crawl.status();
    assert_eq!(status.num_visited, 2);
    assert_eq!(status.num_queued, 2);

    // Page record on disk
    let record = crawl.page(&format!("{}a", base)).unwrap();
    assert_eq!(record.crawl_id, "small");
    assert_eq!(record.page_type, PageType::Html);
    assert_eq!(record.title.as_deref(), Some("/a"));
    assert_eq!(record.parent_urls, vec![base.clone()]);
    assert_eq!(record.status_code, Some(200));

    let children = crawl.child_urls(&base).unwrap();
    assert_eq!(children.len(), 3);

    // Sidecar on disk
    assert!(dir.path().join("small.json").exists());
}

#[tokio::test]
async fn test_resume_with_higher_cap() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/", "Home", &["/a", "/b", "/c"]).await;
    mount_page(&server, "/a", "A", &[]).await;
    mount_page(&server, "/b", "B", &["/"]).await;
    mount_page(&server, "/c", "C", &["/d"]).await;
    mount_page(&server, "/d", "D", &[]).await;

    let config = config_for(&server, &dir).with_max_pages(2);
    let crawl = LocalCrawl::with_id("resumable", config).unwrap();
    crawl.run().await.unwrap();
    assert_eq!(crawl.visited_urls().len(), 2);

    // Restore from disk, raise the cap and run again
    let mut restored = LocalCrawl::restore("resumable", dir.path()).unwrap();
    assert_eq!(restored.visited_urls(), crawl.visited_urls());
    restored.set_max_pages(10).unwrap();
    restored.run().await.unwrap();

    let visited = restored.visited_urls();
    assert_eq!(visited.len(), 5);
    assert!(visited.contains(&format!("{}d", base)));
    assert!(restored.queued(10).is_empty());

    // The seed was never fetched twice
    let requests = server.received_requests().await.unwrap();
    let seed_fetches = requests.iter().filter(|r| r.url.path() == "/").count();
    assert_eq!(seed_fetches, 1);
    assert_partition(&restored.state());
}

#[tokio::test]
async fn test_restore_snapshot_and_continue() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/p", "P", &[]).await;
    mount_page(&server, "/q", "Q", &[]).await;

    let config = config_for(&server, &dir).with_max_pages(10);
    let mut state = CrawlState::new();
    for route in ["", "x", "y"] {
        state.record_visit(
            &format!("{}{}", base, route),
            PathBuf::from(format!("earlier/{}.json", route)),
        );
    }
    let parent = FrontierItem::seed(base.as_str());
    state.frontier.push_back(parent.child(format!("{}p", base)));
    state.frontier.push_back(parent.child(format!("{}q", base)));
    save_sidecar(&Sidecar::capture("snap", &config, &state), dir.path()).unwrap();

    let crawl = LocalCrawl::restore("snap", dir.path()).unwrap();
    let status = crawl.status();
    assert_eq!(status.num_visited, 3);
    assert_eq!(status.num_queued, 2);

    crawl.run().await.unwrap();
    assert_eq!(crawl.visited_urls().len(), 5);
    assert!(crawl.queued(10).is_empty());

    let record = crawl.page(&format!("{}q", base)).unwrap();
    assert_eq!(record.parent_urls, vec![base]);
}

#[tokio::test]
async fn test_fragment_links_are_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/p#one", "/p#two", "/p"]).await;
    Mock::given(method("GET"))
        .and(path("/p"))
        .respond_with(html_page("P", &["/p#self"]))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &dir).with_workers(4);
    let crawl = LocalCrawl::with_id("frag", config).unwrap();
    crawl.run().await.unwrap();

    assert_eq!(crawl.visited_urls().len(), 2);
    assert!(crawl.visited_urls().iter().all(|url| !url.contains('#')));
}

#[tokio::test]
async fn test_banned_and_foreign_links_are_ignored() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        "Home",
        &[
            "/public",
            "/private/secret",
            "/private/open",
            "http://elsewhere.invalid/page",
        ],
    )
    .await;
    mount_page(&server, "/public", "Public", &[]).await;
    mount_page(&server, "/private/open", "Open", &[]).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html_page("Secret", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server, &dir)
        .with_banned(vec![format!("{}private/*", base)])
        .with_allowed(vec![format!("{}private/open", base)]);
    let crawl = LocalCrawl::with_id("scoped", config).unwrap();
    crawl.run().await.unwrap();

    let visited = crawl.visited_urls();
    assert!(visited.contains(&format!("{}public", base)));
    assert!(visited.contains(&format!("{}private/open", base)));
    assert_eq!(visited.len(), 3);

    let ignored = crawl.ignored_urls();
    assert_eq!(
        ignored,
        vec![
            format!("{}private/secret", base),
            "http://elsewhere.invalid/page".to_string(),
        ]
    );
    assert_partition(&crawl.state());
}

#[tokio::test]
async fn test_page_cap_holds_with_many_workers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let links: Vec<String> = (0..20).map(|i| format!("/n{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Home", &link_refs).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/n\d+$"))
        .respond_with(html_page("Leaf", &[]).set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir).with_max_pages(5).with_workers(8);
    let crawl = LocalCrawl::with_id("capped", config).unwrap();
    crawl.run().await.unwrap();

    let state = crawl.state();
    assert_eq!(state.visited.len(), 5);
    assert_eq!(state.queued(), 16);
    assert!(state.failed.is_empty());
    assert_partition(&state);
}

#[tokio::test]
async fn test_non_html_page_is_recorded_as_other() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/", "Home", &["/report.pdf"]).await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 <a href=\"/x\">".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let crawl = LocalCrawl::with_id("mixed", config_for(&server, &dir)).unwrap();
    crawl.run().await.unwrap();

    let record = crawl.page(&format!("{}report.pdf", base)).unwrap();
    assert_eq!(record.page_type, PageType::Other);
    assert!(record.child_urls.is_empty());
    assert!(record.html.is_none());
    assert_eq!(crawl.visited_urls().len(), 2);
}

#[tokio::test]
async fn test_error_status_pages_are_visited() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/", "Home", &["/missing"]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("<html><title>Gone</title></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let crawl = LocalCrawl::with_id("statuses", config_for(&server, &dir)).unwrap();
    crawl.run().await.unwrap();

    let record = crawl.page(&format!("{}missing", base)).unwrap();
    assert_eq!(record.status_code, Some(404));
    assert!(crawl.failed_urls().is_empty());
}

#[tokio::test]
async fn test_unreachable_seed_fails_first_page() {
    let dir = TempDir::new().unwrap();
    let config = CrawlConfig::new("http://127.0.0.1:1/")
        .with_output_dir(dir.path())
        .with_timeout_secs(5);
    let crawl = LocalCrawl::with_id("down", config).unwrap();

    match crawl.run().await {
        Err(WebtError::FirstPageFailed { url }) => assert_eq!(url, "http://127.0.0.1:1/"),
        other => panic!("expected first page failure, got {:?}", other),
    }
    assert!(crawl.visited_urls().is_empty());
    assert_eq!(crawl.status().num_failed, 1);
}

#[tokio::test]
async fn test_unreachable_child_is_failed_and_crawl_continues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());
    let down = "http://127.0.0.1:1/down";

    mount_page(&server, "/", "Home", &["/a", down]).await;
    mount_page(&server, "/a", "A", &[]).await;

    let config = config_for(&server, &dir).with_allowed(vec!["http://127.0.0.1:1/*".to_string()]);
    let crawl = LocalCrawl::with_id("partial", config).unwrap();
    crawl.run().await.unwrap();

    assert_eq!(crawl.visited_urls(), vec![base.clone(), format!("{}a", base)]);
    assert_eq!(crawl.failed_urls(), vec![down.to_string()]);
    assert!(crawl.ignored_urls().is_empty());

    // No page record for the failed URL
    assert!(matches!(crawl.filename(down), Err(WebtError::NotVisited(_))));
    let origin = origin_of(&base).unwrap();
    assert!(!dir.path().join(&origin).join(page_file_name(down)).exists());
    assert!(!dir.path().join("127.0.0.1:1").exists());
    assert_partition(&crawl.state());
}

#[tokio::test]
async fn test_retry_failed_after_recovery() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = format!("{}/", server.uri());

    mount_page(&server, "/", "Home", &[]).await;

    let config = config_for(&server, &dir);
    let mut state = CrawlState::new();
    state.record_failure(&base);
    save_sidecar(&Sidecar::capture("retry", &config, &state), dir.path()).unwrap();

    let mut crawl = LocalCrawl::restore("retry", dir.path()).unwrap();
    assert_eq!(crawl.retry_failed().unwrap(), 1);
    crawl.run().await.unwrap();

    assert_eq!(crawl.visited_urls(), vec![base]);
    assert!(crawl.failed_urls().is_empty());
}

//! Crawl worker: takes items from the frontier until it is closed
//!
//! Each dequeued item goes through the same steps:
//! 1. Normalize the URL and classify it under the state lock, reserving it
//!    when it is crawlable
//! 2. Fetch and extract it (no lock held)
//! 3. Write the page record, mark it visited and push its links
//!
//! Every item is acknowledged on the frontier whatever its outcome.

use crate::crawler::frontier::{Frontier, TaskGuard};
use crate::crawler::parser::{extract_page, ExtractError};
use crate::crawler::{fetch_url, FetchResult};
use crate::state::{FrontierItem, PageType, SharedState};
use crate::storage::{PageRecord, PageStore};
use crate::url::{normalize_url, Classification, UrlScope};
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Everything a worker needs, shared by the whole pool
pub struct WorkerContext {
    pub crawl_id: String,
    pub max_pages: usize,
    pub client: Client,
    pub scope: UrlScope,
    pub storage: Arc<dyn PageStore>,
    pub state: SharedState,
    pub frontier: Frontier,
}

/// Runs one worker until the frontier is closed
pub async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", worker_id);

    while let Some(item) = ctx.frontier.pop().await {
        let _ack = TaskGuard::new(&ctx.frontier);
        process_item(&ctx, item).await;
    }

    tracing::debug!("Worker {} stopped", worker_id);
}

/// Classifies one item and fetches it if crawlable
async fn process_item(ctx: &WorkerContext, item: FrontierItem) {
    let url = match normalize_url(&item.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Ignoring unparseable URL {}: {}", item.url, e);
            ctx.state.lock().record_ignored(&item.url);
            return;
        }
    };

    let item = FrontierItem {
        url: url.to_string(),
        parent_urls: item.parent_urls,
    };

    let classification = {
        let mut state = ctx.state.lock();
        let classification = ctx.scope.classify(
            &url,
            state.is_seen(&item.url),
            state.has_capacity(ctx.max_pages),
        );

        match classification {
            Classification::Crawlable => {
                state.reserve(&item.url);
            }
            Classification::Leftover => {
                state.defer(item.clone());
            }
            Classification::Ignored => state.record_ignored(&item.url),
            Classification::Visited => {}
        }
        classification
    };

    match classification {
        Classification::Crawlable => fetch_and_record(ctx, &url, &item).await,
        Classification::Leftover => tracing::trace!("Page cap reached, deferring {}", item.url),
        Classification::Ignored => tracing::trace!("Out of scope: {}", item.url),
        Classification::Visited => tracing::trace!("Already seen: {}", item.url),
    }
}

/// Fetches a reserved URL and records the outcome
async fn fetch_and_record(ctx: &WorkerContext, url: &Url, item: &FrontierItem) {
    tracing::debug!("Fetching {}", item.url);

    let (status_code, content_type, body) = match fetch_url(&ctx.client, url.as_str()).await {
        FetchResult::Success {
            status_code,
            content_type,
            body,
        } => (status_code, content_type, body),
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to fetch {}: {}", item.url, error);
            ctx.state.lock().record_failure(&item.url);
            return;
        }
    };

    let record = build_page_record(
        &ctx.crawl_id,
        item,
        ctx.scope.base_url(),
        status_code,
        content_type.as_deref(),
        &body,
    );

    match ctx.storage.write_page(&record) {
        Ok(path) => {
            ctx.state.lock().record_visit(&item.url, path);
            tracing::info!(
                "Visited {} ({} {}, {} links)",
                item.url,
                status_code,
                record.page_type,
                record.child_urls.len()
            );
            for child in &record.child_urls {
                ctx.frontier.push(item.child(child.as_str()));
            }
        }
        Err(e) => {
            tracing::error!("Failed to write page record for {}: {}", item.url, e);
            ctx.state.lock().record_failure(&item.url);
        }
    }
}

/// Builds the page record for a fetched response
///
/// HTML bodies yield a title, visible text and child links, with relative
/// hrefs resolved against the crawl's `base_url`. Anything else is stored as
/// `other` with no links, keeping the raw text when it decodes.
pub fn build_page_record(
    crawl_id: &str,
    item: &FrontierItem,
    base_url: &Url,
    status_code: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> PageRecord {
    let mut record = PageRecord {
        crawl_id: crawl_id.to_string(),
        url: item.url.clone(),
        page_type: PageType::Other,
        title: None,
        fetched_at: Utc::now(),
        parent_urls: item.parent_urls.clone(),
        child_urls: BTreeSet::new(),
        html: None,
        text: None,
        status_code: Some(status_code),
    };

    match extract_page(body, content_type, base_url) {
        Ok(parsed) => {
            record.page_type = PageType::Html;
            record.title = Some(parsed.title);
            record.text = Some(parsed.text);
            record.html = Some(parsed.html);
            record.child_urls = parsed.links;
        }
        Err(ExtractError::NotHtml(content_type)) => {
            tracing::debug!("{} is {}, storing as other", item.url, content_type);
            record.text = String::from_utf8(body.to_vec()).ok();
        }
        Err(ExtractError::InvalidUtf8) => {
            tracing::debug!("{} is not valid UTF-8, storing as other", item.url);
        }
    }

    record
}

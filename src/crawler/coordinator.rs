//! Crawler coordinator - runs the worker pool for one crawl pass
//!
//! A pass takes the pending frontier out of the crawl state (dropping the
//! previous pass's ignored URLs), starts the configured number of workers,
//! waits until every queued item has been acknowledged, closes the frontier
//! and reconciles the state: items deferred by the page cap become the
//! frontier of the next pass.

use crate::config::CrawlConfig;
use crate::crawler::frontier::Frontier;
use crate::crawler::worker::{run_worker, WorkerContext};
use crate::crawler::build_http_client;
use crate::state::SharedState;
use crate::storage::{FileStorage, PageStore};
use crate::url::UrlScope;
use crate::WebtError;
use std::sync::Arc;
use std::time::Instant;

/// Counts for one finished pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pages visited during this pass
    pub visited: usize,
    /// Items left in the frontier for the next pass
    pub queued: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    crawl_id: String,
    config: CrawlConfig,
    scope: UrlScope,
    storage: Arc<dyn PageStore>,
    state: SharedState,
}

impl Coordinator {
    /// Creates a coordinator for a crawl
    ///
    /// # Arguments
    ///
    /// * `crawl_id` - Id written into every page record
    /// * `config` - The crawl configuration
    /// * `state` - State shared with the crawl facade
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Scope rules compiled
    /// * `Err(WebtError)` - The base URL or a pattern is invalid
    pub fn new(crawl_id: &str, config: &CrawlConfig, state: SharedState) -> Result<Self, WebtError> {
        let scope = UrlScope::from_config(config)?;
        let storage = FileStorage::new(&config.output_dir, scope.base_origin());

        Ok(Self {
            crawl_id: crawl_id.to_string(),
            config: config.clone(),
            scope,
            storage: Arc::new(storage),
            state,
        })
    }

    /// Runs one pass of the worker pool over the pending frontier
    pub async fn run(&self) -> Result<RunSummary, WebtError> {
        let (items, visited_before) = {
            let mut state = self.state.lock();
            (state.begin_run(), state.visited.len())
        };

        tracing::info!(
            "Starting crawl {} with {} queued URLs and {} workers",
            self.crawl_id,
            items.len(),
            self.config.workers
        );
        let start_time = Instant::now();

        let client = build_http_client(&self.config)?;
        let ctx = Arc::new(WorkerContext {
            crawl_id: self.crawl_id.clone(),
            max_pages: self.config.max_pages,
            client,
            scope: self.scope.clone(),
            storage: Arc::clone(&self.storage),
            state: self.state.clone(),
            frontier: Frontier::from_items(items),
        });

        let handles: Vec<_> = (0..self.config.workers.max(1))
            .map(|worker_id| tokio::spawn(run_worker(worker_id, Arc::clone(&ctx))))
            .collect();

        ctx.frontier.join().await;
        let undrained = ctx.frontier.close();

        let mut worker_error = None;
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
                if worker_error.is_none() {
                    worker_error = Some(e);
                }
            }
        }

        let summary = {
            let mut state = self.state.lock();
            // Only reachable if a worker panicked between pop and acknowledge
            state.frontier.extend(undrained);
            state.finish_run();
            RunSummary {
                visited: state.visited.len().saturating_sub(visited_before),
                queued: state.queued(),
            }
        };

        tracing::info!(
            "Crawl {} pass finished: {} pages visited, {} queued, in {:?}",
            self.crawl_id,
            summary.visited,
            summary.queued,
            start_time.elapsed()
        );

        match worker_error {
            Some(e) => Err(e.into()),
            None => Ok(summary),
        }
    }
}

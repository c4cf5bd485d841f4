//! Crawl progress tracking
//!
//! `CrawlState` holds every outcome of a crawl: visited pages and their record
//! files, failed and ignored URLs, work deferred by the page cap, and the
//! pending frontier. During a run it is shared between workers behind
//! `SharedState`; each worker takes the lock only to classify or record one
//! item and never while a request is in flight.

use crate::state::FrontierItem;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Aggregate crawl progress
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// Visited URL -> path of its page record; a URL enters at most once
    pub visited: BTreeMap<String, PathBuf>,

    /// URLs whose fetch failed at the transport level
    pub failed: BTreeSet<String>,

    /// URLs found out of scope during the latest run
    pub ignored: BTreeSet<String>,

    /// In-scope items discovered after the page cap was reached, in order
    pub leftover: Vec<FrontierItem>,

    /// Pending work for the next run
    pub frontier: VecDeque<FrontierItem>,

    /// URLs reserved by a worker whose fetch has not finished yet
    in_flight: HashSet<String>,

    /// URLs already in `leftover`
    leftover_urls: HashSet<String>,
}

impl CrawlState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state whose frontier holds only the seed URL
    pub fn seeded(base_url: &str) -> Self {
        let mut state = Self::new();
        state.frontier.push_back(FrontierItem::seed(base_url));
        state
    }

    /// Returns true if the URL was visited or is being fetched right now
    pub fn is_seen(&self, url: &str) -> bool {
        self.visited.contains_key(url) || self.in_flight.contains(url)
    }

    /// Number of pages visited or reserved; compared against the page cap
    pub fn reserved_count(&self) -> usize {
        self.visited.len() + self.in_flight.len()
    }

    /// Returns true if another page may be reserved under `max_pages`
    pub fn has_capacity(&self, max_pages: usize) -> bool {
        self.reserved_count() < max_pages
    }

    /// Reserves a URL for fetching
    ///
    /// Returns false if the URL was already seen.
    pub fn reserve(&mut self, url: &str) -> bool {
        if self.is_seen(url) {
            return false;
        }
        self.in_flight.insert(url.to_string())
    }

    /// Records a successful visit and releases the reservation
    ///
    /// A URL that failed in an earlier attempt is removed from `failed`.
    pub fn record_visit(&mut self, url: &str, path: PathBuf) {
        self.in_flight.remove(url);
        self.failed.remove(url);
        self.visited.insert(url.to_string(), path);
    }

    /// Records a failed fetch and releases the reservation
    pub fn record_failure(&mut self, url: &str) {
        self.in_flight.remove(url);
        self.failed.insert(url.to_string());
    }

    /// Records an out-of-scope URL
    pub fn record_ignored(&mut self, url: &str) {
        self.ignored.insert(url.to_string());
    }

    /// Defers an in-scope item to a later run
    ///
    /// Returns false if an item for the same URL is already deferred.
    pub fn defer(&mut self, item: FrontierItem) -> bool {
        if !self.leftover_urls.insert(item.url.clone()) {
            return false;
        }
        self.leftover.push(item);
        true
    }

    /// Takes the pending frontier for a run, leaving it empty
    pub fn take_frontier(&mut self) -> Vec<FrontierItem> {
        self.frontier.drain(..).collect()
    }

    /// Starts a run: returns its frontier and forgets the previous run's
    /// ignored URLs, which this run's ignored set replaces
    pub fn begin_run(&mut self) -> Vec<FrontierItem> {
        self.ignored.clear();
        self.take_frontier()
    }

    /// Reconciles state after a run
    ///
    /// Deferred items become the frontier for the next run. Reservations are
    /// cleared; every worker has stopped by the time this is called.
    pub fn finish_run(&mut self) {
        self.in_flight.clear();
        self.leftover_urls.clear();
        self.frontier.extend(self.leftover.drain(..));
    }

    /// Moves failed URLs back into the frontier
    ///
    /// Returns the number of URLs re-queued.
    pub fn retry_failed(&mut self) -> usize {
        let failed = std::mem::take(&mut self.failed);
        let count = failed.len();
        self.frontier
            .extend(failed.into_iter().map(FrontierItem::seed));
        count
    }

    /// Number of URLs waiting in the frontier
    pub fn queued(&self) -> usize {
        self.frontier.len()
    }

    /// Returns true if this state holds no outcome at all
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
            && self.failed.is_empty()
            && self.ignored.is_empty()
            && self.leftover.is_empty()
            && self.frontier.is_empty()
    }
}

/// `CrawlState` shared between the crawl facade and its workers
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<CrawlState>>);

impl SharedState {
    pub fn new(state: CrawlState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Locks the state
    ///
    /// A worker that panicked while holding the lock leaves the collections
    /// consistent (every mutation is a single insert or remove), so a poisoned
    /// lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Shared frontier queue for the worker pool
//!
//! The frontier is a multi-producer, multi-consumer FIFO. Workers both take
//! items from it and push the links they discover back into it. Every pushed
//! item counts as unfinished until a worker acknowledges it with
//! `task_done`, which lets the coordinator wait for a true drain (`join`)
//! rather than for a momentarily empty queue. `close` wakes every waiting
//! worker so the pool can shut down.

use crate::state::FrontierItem;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<FrontierItem>,
    /// Items pushed but not yet acknowledged
    unfinished: usize,
    closed: bool,
}

/// Concurrent work queue with acknowledgement and join
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    item_ready: Notify,
    drained: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding `items`, all counted as unfinished
    pub fn from_items(items: impl IntoIterator<Item = FrontierItem>) -> Self {
        let queue: VecDeque<FrontierItem> = items.into_iter().collect();
        let unfinished = queue.len();
        Self {
            inner: Mutex::new(FrontierInner {
                queue,
                unfinished,
                closed: false,
            }),
            item_ready: Notify::new(),
            drained: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item and wakes one waiting worker
    ///
    /// Items pushed after `close` are dropped.
    pub fn push(&self, item: FrontierItem) {
        {
            let mut inner = self.lock();
            if inner.closed {
                tracing::trace!("Frontier closed, dropping {}", item.url);
                return;
            }
            inner.queue.push_back(item);
            inner.unfinished += 1;
        }
        self.item_ready.notify_one();
    }

    /// Takes the next item, waiting while the queue is empty
    ///
    /// Returns `None` once the frontier is closed.
    pub async fn pop(&self) -> Option<FrontierItem> {
        loop {
            let notified = self.item_ready.notified();
            tokio::pin!(notified);
            // Register before checking so a push or close in between is not missed
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(item) = inner.queue.pop_front() {
                    let more = !inner.queue.is_empty();
                    drop(inner);
                    if more {
                        self.item_ready.notify_one();
                    }
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Acknowledges one item taken with `pop`, whatever its outcome
    pub fn task_done(&self) {
        let drained = {
            let mut inner = self.lock();
            inner.unfinished = inner.unfinished.saturating_sub(1);
            inner.unfinished == 0
        };
        if drained {
            self.drained.notify_waiters();
        }
    }

    /// Waits until every pushed item has been acknowledged
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().unfinished == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Closes the frontier and wakes every waiting worker
    ///
    /// Returns the items that were still queued.
    pub fn close(&self) -> Vec<FrontierItem> {
        let remaining = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.unfinished = 0;
            inner.queue.drain(..).collect()
        };
        self.item_ready.notify_waiters();
        self.drained.notify_waiters();
        remaining
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if no items are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items pushed but not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }
}

/// Acknowledges a popped item when dropped
///
/// Holding one of these while processing an item keeps `join` accurate even
/// if processing unwinds.
pub struct TaskGuard<'a> {
    frontier: &'a Frontier,
}

impl<'a> TaskGuard<'a> {
    pub fn new(frontier: &'a Frontier) -> Self {
        Self { frontier }
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn item(url: &str) -> FrontierItem {
        FrontierItem::seed(url)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::from_items(vec![item("a"), item("b")]);
        frontier.push(item("c"));

        assert_eq!(frontier.pop().await.unwrap().url, "a");
        assert_eq!(frontier.pop().await.unwrap().url, "b");
        assert_eq!(frontier.pop().await.unwrap().url, "c");
        assert!(frontier.is_empty());
    }

    #[tokio::test]
    async fn test_join_waits_for_acknowledgement() {
        let frontier = Arc::new(Frontier::from_items(vec![item("a")]));
        assert_eq!(frontier.unfinished(), 1);

        let popped = frontier.pop().await.unwrap();
        assert_eq!(popped.url, "a");
        assert!(frontier.is_empty());

        // Queue is empty but the item is not acknowledged yet
        assert!(timeout(Duration::from_millis(50), frontier.join()).await.is_err());

        frontier.task_done();
        timeout(Duration::from_secs(1), frontier.join())
            .await
            .expect("join should finish after task_done");
    }

    #[tokio::test]
    async fn test_join_on_empty_frontier_returns() {
        let frontier = Frontier::new();
        timeout(Duration::from_secs(1), frontier.join())
            .await
            .expect("empty frontier is already drained");
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let frontier = Arc::new(Frontier::new());
        let consumer = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push(item("late"));

        let popped = timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .unwrap();
        assert_eq!(popped.unwrap().url, "late");
    }

    #[tokio::test]
    async fn test_close_wakes_all_waiters() {
        let frontier = Arc::new(Frontier::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move { frontier.pop().await }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.close();

        for handle in handles {
            let result = timeout(Duration::from_secs(1), handle)
                .await
                .expect("waiter should wake on close")
                .unwrap();
            assert!(result.is_none());
        }
        assert!(frontier.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_close_returns_remaining_and_drops_new_pushes() {
        let frontier = Frontier::from_items(vec![item("a"), item("b")]);
        let remaining = frontier.close();
        assert_eq!(remaining.len(), 2);

        frontier.push(item("c"));
        assert!(frontier.is_empty());
        assert!(frontier.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_task_guard_acknowledges_on_drop() {
        let frontier = Frontier::from_items(vec![item("a")]);
        let _popped = frontier.pop().await.unwrap();
        {
            let _guard = TaskGuard::new(&frontier);
        }
        assert_eq!(frontier.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_many_consumers_drain_everything() {
        let frontier = Arc::new(Frontier::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::new();
        for _ in 0..4 {
            let frontier = Arc::clone(&frontier);
            let seen = Arc::clone(&seen);
            workers.push(tokio::spawn(async move {
                while let Some(item) = frontier.pop().await {
                    let _guard = TaskGuard::new(&frontier);
                    // Each item below depth 3 fans out into two children
                    let depth = item.parent_urls.len();
                    if depth < 3 {
                        frontier.push(item.child(format!("{}0", item.url)));
                        frontier.push(item.child(format!("{}1", item.url)));
                    }
                    seen.lock().unwrap().push(item.url);
                }
            }));
        }

        frontier.push(item("r"));
        timeout(Duration::from_secs(5), frontier.join())
            .await
            .expect("frontier should drain");
        frontier.close();
        for worker in workers {
            worker.await.unwrap();
        }

        // 1 + 2 + 4 + 8 nodes in a binary tree of depth 3
        assert_eq!(seen.lock().unwrap().len(), 15);
    }
}

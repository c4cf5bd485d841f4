//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: visited, failed, ignored, deferred and pending URLs
//! - `SharedState`: the lock-guarded handle workers share during a run
//! - `FrontierItem`: one URL to process plus the chain of pages that led to it
//! - `PageType`: whether a visited page was parsed as HTML

mod crawl_state;
mod frontier_item;
mod page_type;

// Re-export main types
pub use crawl_state::{CrawlState, SharedState};
pub use frontier_item::FrontierItem;
pub use page_type::PageType;

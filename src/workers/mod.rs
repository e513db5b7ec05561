//! Background work over fixed-size thread pools.
//!
//! Each worker reports progress through an event callback and returns its
//! aggregated result once every task has finished.

pub mod download;
pub mod fetch;
pub mod login;
pub mod query;
pub mod update;

use anyhow::{Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use download::{download_assets, DownloadEvent, DownloadRequest, DownloadSummary};
pub use fetch::{fetch_remote_words, FetchEvent};
pub use login::{check_login, LoginEvent};
pub use query::{run_queries, QueryEvent, QueryOptions, QueryOutcome};
pub use update::{check_for_update, NewVersion};

/// Cooperative cancellation flag, checked between tasks
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) fn build_pool(name: &'static str, threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .with_context(|| format!("Failed to build {} thread pool", name))
}

/// The pools background work runs on
pub struct WorkerPools {
    /// Login check, word fetching and queries
    pub work: ThreadPool,
    /// Update check
    pub update: ThreadPool,
    /// Asset downloads
    pub assets: ThreadPool,
}

impl WorkerPools {
    pub const WORK_THREADS: usize = 3;
    pub const UPDATE_THREADS: usize = 1;
    pub const ASSET_THREADS: usize = 3;

    pub fn new() -> Result<Self> {
        Ok(Self {
            work: build_pool("work", Self::WORK_THREADS)?,
            update: build_pool("update", Self::UPDATE_THREADS)?,
            assets: build_pool("assets", Self::ASSET_THREADS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_pool_sizes() {
        let pools = WorkerPools::new().unwrap();
        assert_eq!(pools.work.current_num_threads(), 3);
        assert_eq!(pools.update.current_num_threads(), 1);
        assert_eq!(pools.assets.current_num_threads(), 3);
    }
}

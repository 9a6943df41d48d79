//! Purge log guarding stores that race an invalidation.
//!
//! Every purge advances a global epoch and stamps the purged tag or path
//! with it. A reader takes an [`Epoch`] before it fetches or renders, and may
//! only store its result while none of the result's tags or its path were
//! purged after that epoch. Purges hold the write lock while they drop
//! entries and stores hold the read lock while they insert, so an insert can
//! never land between a purge's check and its removal.

use std::collections::HashMap;
use std::sync::RwLock;

use super::keys::CacheTag;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::epoch";

/// Point in the purge history observed before a fetch or render began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch(u64);

#[derive(Default)]
struct Log {
    current: u64,
    cleared_at: u64,
    tags: HashMap<CacheTag, u64>,
    paths: HashMap<String, u64>,
}

impl Log {
    fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    fn purged_since<'a>(
        &self,
        observed: Epoch,
        tags: impl IntoIterator<Item = &'a CacheTag>,
        path: Option<&str>,
    ) -> bool {
        if self.cleared_at > observed.0 {
            return true;
        }
        let tag_purged = tags
            .into_iter()
            .any(|tag| self.tags.get(tag).is_some_and(|at| *at > observed.0));
        let path_purged =
            path.is_some_and(|path| self.paths.get(path).is_some_and(|at| *at > observed.0));
        tag_purged || path_purged
    }
}

#[derive(Default)]
pub struct PurgeLog {
    log: RwLock<Log>,
}

impl PurgeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self) -> Epoch {
        Epoch(rw_read(&self.log, SOURCE, "observe").current)
    }

    /// Run `insert` unless a tag or the path (already normalized) was purged
    /// after `observed`. Returns `None` when the insert was skipped.
    pub fn store_if_current<'a, R>(
        &self,
        observed: Epoch,
        tags: impl IntoIterator<Item = &'a CacheTag>,
        path: Option<&str>,
        insert: impl FnOnce() -> R,
    ) -> Option<R> {
        let log = rw_read(&self.log, SOURCE, "store_if_current");
        if log.purged_since(observed, tags, path) {
            return None;
        }
        Some(insert())
    }

    pub fn purge_tag<R>(&self, tag: &str, remove: impl FnOnce() -> R) -> R {
        let mut log = rw_write(&self.log, SOURCE, "purge_tag");
        let at = log.advance();
        log.tags.insert(CacheTag::from(tag), at);
        remove()
    }

    pub fn purge_path<R>(&self, path: &str, remove: impl FnOnce() -> R) -> R {
        let mut log = rw_write(&self.log, SOURCE, "purge_path");
        let at = log.advance();
        log.paths.insert(path.to_string(), at);
        remove()
    }

    /// Stamps everything at once; the per-key stamps become redundant.
    pub fn purge_all<R>(&self, remove: impl FnOnce() -> R) -> R {
        let mut log = rw_write(&self.log, SOURCE, "purge_all");
        let at = log.advance();
        log.cleared_at = at;
        log.tags.clear();
        log.paths.clear();
        remove()
    }
}

//! Dependency collector for the response cache.
//!
//! Uses `tokio::task_local!` so the content layer can record which cache tags
//! a response was built from without threading a collector through every
//! call. The response cache middleware opens a collector per request and
//! registers what was recorded next to the stored response.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use super::keys::CacheTag;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::deps";

type Collected = Arc<Mutex<HashSet<CacheTag>>>;

tokio::task_local! {
    static DEPS: Collected;
}

/// Record a tag dependency. A no-op when no collector is active.
pub fn record(tag: &CacheTag) {
    record_all(std::iter::once(tag));
}

/// Record several tag dependencies at once.
pub fn record_all<'a>(tags: impl IntoIterator<Item = &'a CacheTag>) {
    let _ = DEPS.try_with(|deps| {
        let mut guard = mutex_lock(deps, SOURCE, "record");
        guard.extend(tags.into_iter().cloned());
    });
}

/// Whether the current task runs inside a collector.
pub fn is_collecting() -> bool {
    DEPS.try_with(|_| ()).is_ok()
}

/// Run `f` with a fresh collector and return its output together with every
/// tag recorded while it ran.
pub async fn with_collector<F, R>(f: F) -> (R, HashSet<CacheTag>)
where
    F: Future<Output = R>,
{
    let deps: Collected = Arc::default();
    let result = DEPS.scope(Arc::clone(&deps), f).await;
    let collected = std::mem::take(&mut *mutex_lock(&deps, SOURCE, "with_collector"));
    (result, collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_without_collector_is_no_op() {
        assert!(!is_collecting());
        record(&CacheTag::from("post"));
    }

    #[tokio::test]
    async fn with_collector_captures_dependencies() {
        let (value, deps) = with_collector(async {
            assert!(is_collecting());
            record(&CacheTag::from("generalPage"));
            record(&CacheTag::from("generalPage:faq"));
            42
        })
        .await;

        assert_eq!(value, 42);
        assert_eq!(deps.len(), 2);
        assert!(deps.contains("generalPage:faq"));
    }

    #[tokio::test]
    async fn record_deduplicates() {
        let tag = CacheTag::from("post");
        let (_, deps) = with_collector(async {
            record(&tag);
            record_all([&tag, &tag]);
        })
        .await;

        assert_eq!(deps.len(), 1);
    }

    #[tokio::test]
    async fn nested_awaits_record_into_the_same_collector() {
        async fn load(tag: &'static str) {
            tokio::task::yield_now().await;
            record(&CacheTag::from(tag));
        }

        let (_, deps) = with_collector(async {
            futures::future::join(load("post"), load("program")).await;
        })
        .await;

        assert_eq!(deps.len(), 2);
    }

    #[tokio::test]
    async fn collectors_do_not_leak_between_scopes() {
        let (_, first) = with_collector(async { record(&CacheTag::from("coop")) }).await;
        let (_, second) = with_collector(async {}).await;

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}

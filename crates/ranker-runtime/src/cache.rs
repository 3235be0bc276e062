//! Reply cache for ranker-runtime.
//!
//! Keeps raw scorer replies keyed by a hash of the prompt text. Prompts are
//! deterministic, so identical candidates under the same rubric hit the same
//! entry. Concurrent misses for one key are coalesced: the scorer is invoked
//! once and every waiter gets that result. Failures are not cached.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::scorer::InvocationError;

/// Cache key: hash of the full prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PromptKey(u64);

impl PromptKey {
    pub fn new(prompt: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        prompt.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Prompt-keyed reply cache using moka.
#[derive(Clone)]
pub struct ReplyCache {
    cache: Cache<PromptKey, String>,
}

impl ReplyCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, prompt: &str) -> Option<String> {
        self.cache.get(&PromptKey::new(prompt)).await
    }

    pub async fn insert(&self, prompt: &str, reply: String) {
        self.cache.insert(PromptKey::new(prompt), reply).await;
    }

    /// Return the cached reply, or run `invoke` once and cache its success.
    pub async fn get_or_invoke<F>(&self, prompt: &str, invoke: F) -> Result<String, InvocationError>
    where
        F: Future<Output = Result<String, InvocationError>>,
    {
        self.cache
            .try_get_with(PromptKey::new(prompt), invoke)
            .await
            .map_err(|err| (*err).clone())
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ReplyCache {
    fn default() -> Self {
        Self::new(1_024, Duration::from_secs(3600))
    }
}

impl std::fmt::Debug for ReplyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = ReplyCache::default();

        assert!(cache.get("prompt").await.is_none());
        cache.insert("prompt", "{\"score\": 0.5}".to_string()).await;
        assert_eq!(cache.get("prompt").await.as_deref(), Some("{\"score\": 0.5}"));
        assert!(cache.get("other prompt").await.is_none());
    }

    #[tokio::test]
    async fn test_invokes_once_per_prompt() {
        let cache = ReplyCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let reply = cache
                .get_or_invoke("same prompt", async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("reply".to_string())
                })
                .await
                .unwrap();
            assert_eq!(reply, "reply");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = ReplyCache::default();

        let first = cache
            .get_or_invoke("p", async { Err(InvocationError::Http("down".to_string())) })
            .await;
        assert_eq!(first, Err(InvocationError::Http("down".to_string())));

        let second = cache.get_or_invoke("p", async { Ok("up".to_string()) }).await;
        assert_eq!(second.as_deref(), Ok("up"));
    }

    #[test]
    fn test_key_is_stable() {
        assert_eq!(PromptKey::new("abc"), PromptKey::new("abc"));
        assert_ne!(PromptKey::new("abc"), PromptKey::new("abd"));
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page chaining ("flash") storage.
//!
//! When a handler returns [`Navigation::Page`](crate::Navigation::Page), the
//! dispatcher stores the target instance here and redirects the browser to
//! the target's URI. The next request to that URI claims the entry with
//! [`FlashCache::remove`], so each entry is consumed at most once.
//!
//! Keys combine a conversation key (the `pw-flash` cookie, when the client
//! sends one) with the target URI.

use crate::class::PageInstance;
use crate::error::{PagewrightError, Result};
use crate::page::Page;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Cookie holding the conversation key.
pub const FLASH_COOKIE: &str = "pw-flash";

/// Default number of pending entries kept before the oldest is evicted.
pub const DEFAULT_FLASH_CAPACITY: usize = 256;

/// A chained page waiting for its follow-up request.
#[derive(Debug, Clone)]
pub struct FlashEntry {
    /// The registered page.
    pub page: Arc<Page>,
    /// The live instance to render.
    pub instance: PageInstance,
}

/// Storage for chained pages.
pub trait FlashCache: Send + Sync + fmt::Debug {
    /// Stores an entry under `key`, replacing any previous one.
    fn put(&self, key: &str, entry: FlashEntry) -> Result<()>;

    /// Removes and returns the entry under `key`.
    fn remove(&self, key: &str) -> Result<Option<FlashEntry>>;
}

/// Builds the cache key for a conversation and URI.
pub fn flash_key(conversation: Option<&str>, uri: &str) -> String {
    format!("{}|{}", conversation.unwrap_or_default(), uri)
}

/// In-memory LRU flash cache.
#[derive(Clone)]
pub struct MemoryFlashCache {
    entries: Arc<Mutex<LruCache<String, FlashEntry>>>,
}

impl MemoryFlashCache {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryFlashCache {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH_CAPACITY)
    }
}

impl fmt::Debug for MemoryFlashCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFlashCache").field("pending", &self.len()).finish()
    }
}

impl FlashCache for MemoryFlashCache {
    fn put(&self, key: &str, entry: FlashEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PagewrightError::CacheError("Failed to acquire flash lock".to_string()))?;
        entries.put(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<FlashEntry>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PagewrightError::CacheError("Failed to acquire flash lock".to_string()))?;
        Ok(entries.pop(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::PageClass;
    use crate::page::PageBook;
    use serde_json::json;

    fn entry(book: &PageBook, uri: &str, name: &str) -> FlashEntry {
        let class = PageClass::builder(name).build();
        let page = book.at(uri, &class).unwrap();
        FlashEntry {
            instance: PageInstance::new(&class, json!({ "from": name })),
            page,
        }
    }

    #[test]
    fn test_remove_consumes_once() {
        let book = PageBook::new();
        let cache = MemoryFlashCache::default();
        let key = flash_key(Some("abc"), "/done");

        cache.put(&key, entry(&book, "/done", "Done")).unwrap();
        let claimed = cache.remove(&key).unwrap().expect("entry");
        assert_eq!(claimed.instance.model["from"], "Done");
        assert!(cache.remove(&key).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_per_conversation() {
        assert_ne!(flash_key(Some("a"), "/x"), flash_key(Some("b"), "/x"));
        assert_eq!(flash_key(None, "/x"), flash_key(Some(""), "/x"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let book = PageBook::new();
        let cache = MemoryFlashCache::new(1);
        cache.put("first", entry(&book, "/a", "A")).unwrap();
        cache.put("second", entry(&book, "/b", "B")).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.remove("first").unwrap().is_none());
        assert!(cache.remove("second").unwrap().is_some());

        // zero capacity is clamped to one
        assert!(MemoryFlashCache::new(0).is_empty());
    }
}

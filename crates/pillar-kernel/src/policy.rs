//! Compiled-policy cache.
//!
//! Compiling a rule set (or expanding macro specs into one) is the only
//! work worth reusing across evaluations. A [`PolicyCache`] memoizes the
//! compiled value under a [`PolicyKey`] and hands out shared `Arc`s, so
//! one cache can serve concurrent evaluations read-only.
//!
//! ## Invalidation
//!
//! - [`PolicyKey::Content`] keys are derived from the configuration's
//!   canonical JSON, so an edited configuration gets a fresh key and a
//!   fresh compile. The cost is one serialization + hash per lookup.
//! - [`PolicyKey::Handle`] keys are chosen by the caller. Mutating a
//!   configuration after it was cached under a handle is unsupported: the
//!   cache keeps serving the stale policy until the caller calls
//!   [`PolicyCache::invalidate`] or [`PolicyCache::clear`].

use crate::hash::ContentHash;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyKey {
    /// Identity derived from configuration content.
    Content(ContentHash),
    /// Identity chosen by the caller.
    Handle(String),
}

impl PolicyKey {
    pub fn of<T: Serialize + ?Sized>(config: &T) -> Result<Self, serde_json::Error> {
        ContentHash::of_json(config).map(PolicyKey::Content)
    }

    pub fn handle(name: impl Into<String>) -> Self {
        PolicyKey::Handle(name.into())
    }
}

#[derive(Debug)]
pub struct PolicyCache<P> {
    entries: RwLock<HashMap<PolicyKey, Arc<P>>>,
}

impl<P> Default for PolicyCache<P> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<P> PolicyCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PolicyKey) -> Option<Arc<P>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Return the cached policy for `key`, compiling and inserting it on a
    /// miss. A failed compile caches nothing.
    ///
    /// The compile runs without holding the lock; if two callers race on
    /// the same key, the first insert wins and both receive it.
    pub fn get_or_compile<E>(
        &self,
        key: PolicyKey,
        compile: impl FnOnce() -> Result<P, E>,
    ) -> Result<Arc<P>, E> {
        if let Some(hit) = self.get(&key) {
            tracing::trace!(key = ?key, "policy cache hit");
            return Ok(hit);
        }

        tracing::debug!(key = ?key, "policy cache miss, compiling");
        let compiled = Arc::new(compile()?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.entry(key).or_insert(compiled).clone())
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &PolicyKey) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some();
        if removed {
            tracing::debug!(key = ?key, "policy cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

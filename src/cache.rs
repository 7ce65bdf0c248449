use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// A rendered feed together with the moment it was built.
#[derive(Debug)]
pub struct Entry {
    pub content: Arc<str>,
    pub built_at: Instant,
    pub ttl: Duration,
}

impl Entry {
    pub fn new(content: Arc<str>, ttl: Duration) -> Self {
        Self {
            content,
            built_at: Instant::now(),
            ttl,
        }
    }

    /// Whether the entry is still fresh, judged against `ttl` instead of
    /// the stored one when given.
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        self.built_at.elapsed() < ttl.unwrap_or(self.ttl)
    }
}

pub struct Cache<K, V> {
    enabled: bool,
    inner: RwLock<HashMap<K, Arc<V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            inner: Default::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub async fn insert(&self, key: K, value: V) -> Arc<V> {
        let arcd = Arc::new(value);
        if !self.enabled {
            return arcd;
        }

        self.inner.write().await.insert(key, Arc::clone(&arcd));

        arcd
    }

    pub async fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if !self.enabled {
            return None;
        }

        self.inner.read().await.get(key).map(Arc::clone)
    }

    /// Drops every entry, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.len();
        inner.clear();
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

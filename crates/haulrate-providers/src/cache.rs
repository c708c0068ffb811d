//! # Resolution Cache
//!
//! An abstract key-value interface for geocode and route results, plus an
//! in-memory backend. Entries never expire: a postal code's coordinates and
//! the road distance between two postal codes are treated as pure functions
//! of the key.
//!
//! Concurrent writers for the same key may race. Values for a key are
//! interchangeable, so last write wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use haulrate_core::{CountryCode, PostalCode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A cached value and when it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cached<V> {
    pub value: V,
    pub cached_at: DateTime<Utc>,
}

/// Errors from a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store for resolver results.
///
/// Resolvers treat backend errors as misses on read and log-and-continue on
/// write.
pub trait KeyValueCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<Cached<V>>, CacheError>;
    fn set(&self, key: K, value: V) -> Result<(), CacheError>;
}

/// Geocode cache key: normalized postal code and country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeocodeKey {
    pub postal_code: PostalCode,
    pub country: CountryCode,
}

/// Route cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: PostalCode,
    pub dest: PostalCode,
    pub provider: String,
    pub country: CountryCode,
}

/// Thread-safe in-memory cache backed by `Arc<RwLock<HashMap>>`.
///
/// Cloning shares the underlying map.
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    entries: Arc<RwLock<HashMap<K, Cached<V>>>>,
}

impl<K, V> Clone for MemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, V> MemoryCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> KeyValueCache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<Cached<V>>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: K, value: V) -> Result<(), CacheError> {
        self.entries.write().insert(
            key,
            Cached {
                value,
                cached_at: Utc::now(),
            },
        );
        Ok(())
    }
}

//! Parsed type descriptor caching with LRU eviction.
//!
//! Every block repeats its column descriptors, so a connection reading many
//! blocks of the same shape would otherwise re-parse the same strings. The
//! cache keeps the most recently used trees per connection.

use std::num::NonZeroUsize;
use std::sync::Arc;

use ch_types::{DataType, TypeError};
use lru::LruCache;

use crate::config::DEFAULT_TYPE_CACHE_CAPACITY;

/// LRU cache of parsed [`DataType`] trees keyed by descriptor string.
pub struct TypeCache {
    cache: LruCache<String, Arc<DataType>>,
    hits: u64,
    misses: u64,
}

impl TypeCache {
    /// Create a cache holding at most `capacity` trees.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the tree for `descriptor`, parsing it on a miss.
    ///
    /// Parse failures are not cached.
    pub fn get_or_parse(&mut self, descriptor: &str) -> Result<Arc<DataType>, TypeError> {
        if let Some(data_type) = self.cache.get(descriptor) {
            self.hits += 1;
            tracing::trace!(descriptor, "type cache hit");
            return Ok(Arc::clone(data_type));
        }

        self.misses += 1;
        let data_type = Arc::new(DataType::parse(descriptor)?);
        tracing::trace!(descriptor, "type cache miss");
        self.cache
            .put(descriptor.to_string(), Arc::clone(&data_type));
        Ok(data_type)
    }

    /// Number of cached trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Maximum number of cached trees.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to parse.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every cached tree.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new(DEFAULT_TYPE_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for TypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCache")
            .field("len", &self.cache.len())
            .field("capacity", &self.capacity())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_after_miss() {
        let mut cache = TypeCache::new(4);
        let first = cache.get_or_parse("Array(UInt8)").unwrap();
        let second = cache.get_or_parse("Array(UInt8)").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = TypeCache::new(2);
        cache.get_or_parse("UInt8").unwrap();
        cache.get_or_parse("String").unwrap();
        // Touch UInt8 so String is the least recently used.
        cache.get_or_parse("UInt8").unwrap();
        cache.get_or_parse("Float64").unwrap();

        assert_eq!(cache.len(), 2);
        cache.get_or_parse("UInt8").unwrap();
        assert_eq!(cache.misses(), 3);
        cache.get_or_parse("String").unwrap();
        assert_eq!(cache.misses(), 4);
    }

    #[test]
    fn test_parse_errors_not_cached() {
        let mut cache = TypeCache::default();
        assert!(matches!(
            cache.get_or_parse("Decimal(10, 2)"),
            Err(TypeError::UnknownType(_))
        ));
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 64);
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut cache = TypeCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.get_or_parse("UInt8").unwrap();
        cache.get_or_parse("Int8").unwrap();
        assert_eq!(cache.len(), 1);
    }
}

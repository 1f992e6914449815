//! LRU cache for interpolation weight matrices.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use align_common::Result;
use lru::LruCache;
use tracing::debug;

use crate::triangulation::Point;
use crate::weights::WeightMatrix;

/// Default number of weight matrices kept per interpolator.
pub const DEFAULT_CAPACITY: usize = 8;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CachedWeights {
    source: Vec<Point>,
    target: Vec<Point>,
    weights: Arc<WeightMatrix>,
}

/// Weight matrices keyed by the exact contents of the source and target
/// point sets.
///
/// Keys hash every coordinate bit pattern; a hit is only reported after the
/// stored point sets compare equal, so colliding hashes rebuild.
pub struct WeightCache {
    cache: LruCache<u64, CachedWeights>,
    hits: u64,
    misses: u64,
}

impl WeightCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached weights for this point-set pair or build and store
    /// them.
    pub fn get_or_build<F>(&mut self, source: &[Point], target: &[Point], build: F) -> Result<Arc<WeightMatrix>>
    where
        F: FnOnce() -> Result<WeightMatrix>,
    {
        let key = content_key(source, target);
        if let Some(entry) = self.cache.get(&key) {
            if entry.source == source && entry.target == target {
                self.hits += 1;
                debug!(key, "Weight cache hit");
                return Ok(Arc::clone(&entry.weights));
            }
        }
        self.misses += 1;
        let weights = Arc::new(build()?);
        self.cache.put(
            key,
            CachedWeights {
                source: source.to_vec(),
                target: target.to_vec(),
                weights: Arc::clone(&weights),
            },
        );
        Ok(weights)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for WeightCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Hash of the shapes and every coordinate of both point sets.
pub fn content_key(source: &[Point], target: &[Point]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for points in [source, target] {
        points.len().hash(&mut hasher);
        for p in points {
            p[0].to_bits().hash(&mut hasher);
            p[1].to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::Triangulation;

    fn grid(offset: f64) -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                points.push([i as f64 + offset, j as f64]);
            }
        }
        points
    }

    fn build(source: &[Point], target: &[Point]) -> Result<WeightMatrix> {
        Ok(WeightMatrix::build(&Triangulation::new(source)?, target))
    }

    #[test]
    fn test_hit_on_identical_points() {
        let mut cache = WeightCache::default();
        let (src, tgt) = (grid(0.0), vec![[1.5, 1.5]]);
        cache.get_or_build(&src, &tgt, || build(&src, &tgt)).unwrap();
        cache.get_or_build(&src, &tgt, || build(&src, &tgt)).unwrap();
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn test_same_shape_and_corners_do_not_collide() {
        // Identical shape and identical first/last coordinates, different interior.
        let a = grid(0.0);
        let mut b = a.clone();
        b[5][0] += 0.25;
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0], b[0]);
        assert_eq!(a[a.len() - 1], b[b.len() - 1]);
        assert_ne!(content_key(&a, &[]), content_key(&b, &[]));

        let mut cache = WeightCache::default();
        let tgt = vec![[1.2, 1.1]];
        let wa = cache.get_or_build(&a, &tgt, || build(&a, &tgt)).unwrap();
        let wb = cache.get_or_build(&b, &tgt, || build(&b, &tgt)).unwrap();
        assert_eq!(cache.stats().misses, 2);
        assert_ne!(*wa, *wb);
    }

    #[test]
    fn test_target_change_misses() {
        let mut cache = WeightCache::default();
        let src = grid(0.0);
        cache.get_or_build(&src, &[[1.0, 1.0]], || build(&src, &[[1.0, 1.0]])).unwrap();
        cache.get_or_build(&src, &[[2.0, 1.0]], || build(&src, &[[2.0, 1.0]])).unwrap();
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_capacity_evicts_lru() {
        let mut cache = WeightCache::new(1);
        let tgt = vec![[1.5, 1.5]];
        let (a, b) = (grid(0.0), grid(10.0));
        cache.get_or_build(&a, &tgt, || build(&a, &tgt)).unwrap();
        cache.get_or_build(&b, &tgt, || build(&b, &tgt)).unwrap();
        assert_eq!(cache.len(), 1);
        cache.get_or_build(&a, &tgt, || build(&a, &tgt)).unwrap();
        assert_eq!(cache.stats().misses, 3);
    }
}

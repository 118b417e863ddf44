//! Owner of every generated [`DistrictLayout`], keyed by tile and session seed.
//!
//! A layout is generated on the first request for its key and then shared
//! until the tile unloads or the session seed changes. Layouts are never
//! mutated; reseeding discards them all.

use std::sync::Arc;

use mirage_procgen::{DistrictClassifier, DistrictGenerator, DistrictLayout, TileCoord};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Tile coordinate.
    pub tile: TileCoord,
    /// Session seed the layout was generated with.
    pub session_seed: u64,
}

/// Counters for cache behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Layouts generated.
    pub generated: u64,
    /// Layouts dropped by unload or reseed.
    pub evicted: u64,
}

/// Lazily generates and owns tile layouts.
pub struct LayoutCache {
    generator: DistrictGenerator,
    classifier: Box<dyn DistrictClassifier>,
    session_seed: u64,
    layouts: FxHashMap<LayoutKey, Arc<DistrictLayout>>,
    stats: CacheStats,
}

impl LayoutCache {
    /// An empty cache generating with `generator` and `classifier`.
    pub fn new(
        generator: DistrictGenerator,
        classifier: impl DistrictClassifier + 'static,
        session_seed: u64,
    ) -> Self {
        Self {
            generator,
            classifier: Box::new(classifier),
            session_seed,
            layouts: FxHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    fn key(&self, tile: TileCoord) -> LayoutKey {
        LayoutKey {
            tile,
            session_seed: self.session_seed,
        }
    }

    /// The layout for `tile`, generating it on first request.
    ///
    /// A tile already in the cache is never regenerated.
    pub fn get_or_generate(&mut self, tile: TileCoord) -> Arc<DistrictLayout> {
        let key = self.key(tile);
        if let Some(layout) = self.layouts.get(&key) {
            self.stats.hits += 1;
            trace!(%tile, "layout cache hit");
            return Arc::clone(layout);
        }

        let layout = Arc::new(self.generator.generate_classified(
            tile,
            self.classifier.as_ref(),
            self.session_seed,
        ));
        self.stats.generated += 1;
        self.layouts.insert(key, Arc::clone(&layout));
        layout
    }

    /// The cached layout for `tile`, without generating.
    pub fn get(&self, tile: TileCoord) -> Option<&Arc<DistrictLayout>> {
        self.layouts.get(&self.key(tile))
    }

    /// Whether `tile` has a cached layout.
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.layouts.contains_key(&self.key(tile))
    }

    /// Release the layout for `tile`.
    ///
    /// Returns `None` if it was not loaded. Other holders of the `Arc` keep
    /// their copy alive.
    pub fn unload(&mut self, tile: TileCoord) -> Option<Arc<DistrictLayout>> {
        let removed = self.layouts.remove(&self.key(tile));
        if removed.is_some() {
            self.stats.evicted += 1;
            trace!(%tile, "layout unloaded");
        }
        removed
    }

    /// Switch to a new session seed, discarding every cached layout.
    ///
    /// Returns the number of layouts dropped. Setting the current seed again
    /// keeps the cache.
    pub fn set_session_seed(&mut self, session_seed: u64) -> usize {
        if session_seed == self.session_seed {
            return 0;
        }
        let dropped = self.layouts.len();
        self.layouts.clear();
        self.stats.evicted += dropped as u64;
        self.session_seed = session_seed;
        debug!(session_seed, dropped, "session seed changed, layouts discarded");
        dropped
    }

    /// Current session seed.
    pub fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// Tiles with a cached layout, in no particular order.
    pub fn loaded_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.layouts.keys().map(|k| k.tile)
    }

    /// Every cached layout, in no particular order.
    pub fn layouts(&self) -> impl Iterator<Item = &Arc<DistrictLayout>> + '_ {
        self.layouts.values()
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Total entities across all cached layouts.
    pub fn entity_count(&self) -> usize {
        self.layouts.values().map(|l| l.entities().len()).sum()
    }

    /// Cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The generator used for new layouts.
    pub fn generator(&self) -> &DistrictGenerator {
        &self.generator
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_procgen::{DistrictType, PatternClassifier};

    fn cache(seed: u64) -> LayoutCache {
        LayoutCache::new(DistrictGenerator::default(), PatternClassifier, seed)
    }

    #[test]
    fn test_second_request_hits_cache() {
        let mut cache = cache(1000);
        let tile = TileCoord::new(0, 2);
        let a = cache.get_or_generate(tile);
        let b = cache.get_or_generate(tile);
        assert!(Arc::ptr_eq(&a, &b), "cached layout must be reused");
        assert_eq!(cache.stats().generated, 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(a.district(), DistrictType::Mosque);
    }

    #[test]
    fn test_unload_then_reload_regenerates_identically() {
        let mut cache = cache(1000);
        let tile = TileCoord::new(3, -1);
        let first = cache.get_or_generate(tile);
        assert!(cache.unload(tile).is_some());
        assert!(!cache.contains(tile));
        assert!(cache.unload(tile).is_none());
        let second = cache.get_or_generate(tile);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second, "regeneration must be identical");
        assert_eq!(cache.stats().generated, 2);
        assert_eq!(cache.stats().evicted, 1);
    }

    #[test]
    fn test_reseed_discards_layouts() {
        let mut cache = cache(1);
        for x in 0..4 {
            cache.get_or_generate(TileCoord::new(x, 1));
        }
        let held = cache.get_or_generate(TileCoord::new(0, 1));
        assert_eq!(cache.set_session_seed(1), 0, "same seed keeps the cache");
        assert_eq!(cache.set_session_seed(2), 4);
        assert!(cache.is_empty());
        assert_eq!(held.session_seed(), 1, "outstanding layouts are not mutated");
        let fresh = cache.get_or_generate(TileCoord::new(0, 1));
        assert_eq!(fresh.session_seed(), 2);
    }

    #[test]
    fn test_entity_count_sums_layouts() {
        let mut cache = cache(9);
        let a = cache.get_or_generate(TileCoord::new(0, 2));
        let b = cache.get_or_generate(TileCoord::new(3, -1));
        assert_eq!(
            cache.entity_count(),
            a.entities().len() + b.entities().len()
        );
        let mut tiles: Vec<_> = cache.loaded_tiles().collect();
        tiles.sort();
        assert_eq!(tiles, vec![TileCoord::new(0, 2), TileCoord::new(3, -1)]);
    }

    #[test]
    fn test_out_of_range_tile_caches_empty_layout() {
        let mut cache = cache(9);
        let layout = cache.get_or_generate(TileCoord::new(i32::MAX, 0));
        assert!(layout.is_empty());
        assert_eq!(cache.len(), 1);
    }
}

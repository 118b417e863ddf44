//! Tile streaming around a moving viewer with hysteresis and per-tick budgeting.
//!
//! Tiles within `load_radius` of the viewer's tile are queued nearest-first
//! and generated through the [`LayoutCache`] at most `loads_per_tick` at a
//! time. Tiles beyond `unload_radius` are released, farthest first, at most
//! `unloads_per_tick` per tick. The gap between the two radii keeps tiles on
//! the boundary from thrashing.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use mirage_procgen::TileCoord;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::layout_cache::LayoutCache;

/// Largest load radius a streamer accepts, in tiles. Each tick visits every
/// cell of the `(2r + 1)^2` square around the viewer.
pub const MAX_LOAD_RADIUS: u32 = 64;

/// Configuration for tile streaming.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamConfig {
    /// Tiles within this radius (in tiles) of the viewer are loaded. Clamped
    /// to [`MAX_LOAD_RADIUS`].
    pub load_radius: u32,
    /// Tiles beyond this radius are unloaded. Must be > `load_radius`.
    pub unload_radius: u32,
    /// Maximum number of tiles generated per tick.
    pub loads_per_tick: u32,
    /// Maximum number of tiles released per tick.
    pub unloads_per_tick: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            load_radius: 3,
            unload_radius: 5,
            loads_per_tick: 4,
            unloads_per_tick: 8,
        }
    }
}

impl StreamConfig {
    /// The config with `load_radius` clamped to [`MAX_LOAD_RADIUS`] and
    /// `unload_radius` raised above it if needed.
    pub fn sanitized(mut self) -> Self {
        if self.load_radius > MAX_LOAD_RADIUS {
            warn!(
                load_radius = self.load_radius,
                max = MAX_LOAD_RADIUS,
                "load radius too large, clamping"
            );
            self.load_radius = MAX_LOAD_RADIUS;
        }
        if self.unload_radius <= self.load_radius {
            let fixed = self.load_radius.saturating_add(1);
            warn!(
                load_radius = self.load_radius,
                unload_radius = self.unload_radius,
                fixed,
                "unload radius must exceed load radius"
            );
            self.unload_radius = fixed;
        }
        self
    }
}

/// Tiles awaiting generation, nearest first.
#[derive(Debug, Default)]
pub struct TileLoadQueue {
    queue: BinaryHeap<Reverse<(u64, TileCoord)>>,
    pending: FxHashSet<TileCoord>,
}

impl TileLoadQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `tile` at squared distance `dist_sq`. Already-queued tiles are
    /// ignored.
    pub fn enqueue(&mut self, tile: TileCoord, dist_sq: u64) {
        if self.pending.insert(tile) {
            self.queue.push(Reverse((dist_sq, tile)));
        }
    }

    /// Pop the nearest tile. Ties break on tile coordinate.
    pub fn dequeue(&mut self) -> Option<(u64, TileCoord)> {
        while let Some(Reverse((dist_sq, tile))) = self.queue.pop() {
            if self.pending.remove(&tile) {
                return Some((dist_sq, tile));
            }
        }
        None
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending tiles.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending tile.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }
}

/// Result of one streaming tick.
#[derive(Debug, Default, PartialEq)]
pub struct StreamTick {
    /// Tiles generated this tick, nearest first.
    pub loaded: Vec<TileCoord>,
    /// Tiles released this tick, farthest first.
    pub unloaded: Vec<TileCoord>,
    /// Tiles still waiting after this tick.
    pub pending: usize,
}

impl StreamTick {
    /// Whether the loaded tile set changed.
    pub fn changed(&self) -> bool {
        !self.loaded.is_empty() || !self.unloaded.is_empty()
    }
}

/// Drives a [`LayoutCache`] from the viewer's tile.
#[derive(Debug)]
pub struct TileStreamer {
    config: StreamConfig,
    queue: TileLoadQueue,
}

impl TileStreamer {
    /// A streamer with `config`, sanitised.
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config: config.sanitized(),
            queue: TileLoadQueue::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The pending load queue.
    pub fn queue(&self) -> &TileLoadQueue {
        &self.queue
    }

    /// Forget pending loads, e.g. after the session seed changed.
    pub fn reset(&mut self) {
        self.queue.clear();
    }

    /// Run one tick.
    ///
    /// 1. Queue every tile within `load_radius` that is not cached.
    /// 2. Generate up to `loads_per_tick` queued tiles, skipping any that
    ///    drifted beyond `load_radius` since they were queued.
    /// 3. Release up to `unloads_per_tick` tiles beyond `unload_radius`.
    pub fn tick(&mut self, viewer_tile: TileCoord, cache: &mut LayoutCache) -> StreamTick {
        let mut result = StreamTick::default();

        let lr = i32::try_from(self.config.load_radius).unwrap_or(i32::MAX);
        let lr_sq = u64::from(self.config.load_radius).pow(2);
        for dy in -lr..=lr {
            for dx in -lr..=lr {
                let dist_sq = (i64::from(dx).pow(2) + i64::from(dy).pow(2)) as u64;
                if dist_sq > lr_sq {
                    continue;
                }
                let tile = viewer_tile.offset(dx, dy);
                if !cache.contains(tile) {
                    self.queue.enqueue(tile, dist_sq);
                }
            }
        }

        while (result.loaded.len() as u32) < self.config.loads_per_tick {
            let Some((_, tile)) = self.queue.dequeue() else {
                break;
            };
            if cache.contains(tile) || tile.distance_sq(viewer_tile) > lr_sq {
                continue;
            }
            cache.get_or_generate(tile);
            result.loaded.push(tile);
        }

        let ur_sq = u64::from(self.config.unload_radius).pow(2);
        let mut candidates: Vec<(u64, TileCoord)> = cache
            .loaded_tiles()
            .map(|tile| (tile.distance_sq(viewer_tile), tile))
            .filter(|&(d, _)| d > ur_sq)
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        for (_, tile) in candidates
            .into_iter()
            .take(self.config.unloads_per_tick as usize)
        {
            cache.unload(tile);
            result.unloaded.push(tile);
        }

        result.pending = self.queue.len();
        if result.changed() {
            debug!(
                viewer = %viewer_tile,
                loaded = result.loaded.len(),
                unloaded = result.unloaded.len(),
                pending = result.pending,
                resident = cache.len(),
                "streaming tick"
            );
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_procgen::{DistrictGenerator, PatternClassifier};

    fn cache() -> LayoutCache {
        LayoutCache::new(DistrictGenerator::default(), PatternClassifier, 7)
    }

    fn unlimited(load_radius: u32, unload_radius: u32) -> StreamConfig {
        StreamConfig {
            load_radius,
            unload_radius,
            loads_per_tick: 10_000,
            unloads_per_tick: 10_000,
        }
    }

    #[test]
    fn test_tiles_within_radius_loaded() {
        let mut streamer = TileStreamer::new(unlimited(2, 4));
        let mut cache = cache();
        streamer.tick(TileCoord::new(0, 0), &mut cache);

        let mut expected = 0;
        for dx in -2i32..=2 {
            for dy in -2i32..=2 {
                if dx * dx + dy * dy <= 4 {
                    expected += 1;
                }
            }
        }
        assert_eq!(cache.len(), expected);
        assert_eq!(expected, 13);
    }

    #[test]
    fn test_loads_nearest_first() {
        let config = StreamConfig {
            loads_per_tick: 5,
            ..unlimited(3, 5)
        };
        let mut streamer = TileStreamer::new(config);
        let mut cache = cache();
        let viewer = TileCoord::new(10, 10);
        let tick = streamer.tick(viewer, &mut cache);
        assert_eq!(tick.loaded[0], viewer, "viewer tile loads first");
        let dists: Vec<u64> = tick.loaded.iter().map(|t| t.distance_sq(viewer)).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]), "not nearest-first: {dists:?}");
        assert!(dists.iter().all(|&d| d <= 1));
    }

    #[test]
    fn test_budget_limits_loads_per_tick() {
        let config = StreamConfig {
            loads_per_tick: 3,
            ..unlimited(10, 12)
        };
        let mut streamer = TileStreamer::new(config);
        let mut cache = cache();
        let viewer = TileCoord::new(0, 0);

        let r1 = streamer.tick(viewer, &mut cache);
        assert_eq!(r1.loaded.len(), 3);
        assert_eq!(cache.len(), 3);

        let r2 = streamer.tick(viewer, &mut cache);
        assert_eq!(r2.loaded.len(), 3);
        assert_eq!(cache.len(), 6);
        assert!(r2.pending > 0);
    }

    #[test]
    fn test_tiles_beyond_unload_radius_released() {
        let mut streamer = TileStreamer::new(unlimited(1, 3));
        let mut cache = cache();
        for d in 1..=6 {
            cache.get_or_generate(TileCoord::new(d, 0));
        }
        let tick = streamer.tick(TileCoord::new(0, 0), &mut cache);
        assert_eq!(
            tick.unloaded,
            vec![TileCoord::new(6, 0), TileCoord::new(5, 0), TileCoord::new(4, 0)],
            "farthest tiles released first"
        );
        assert!(cache.contains(TileCoord::new(3, 0)));
    }

    #[test]
    fn test_hysteresis_prevents_thrashing() {
        let mut streamer = TileStreamer::new(unlimited(2, 4));
        let mut cache = cache();
        streamer.tick(TileCoord::new(0, 0), &mut cache);
        assert!(cache.contains(TileCoord::new(2, 0)));

        // (2, 0) is 3 tiles away: outside load radius, inside unload radius.
        streamer.tick(TileCoord::new(-1, 0), &mut cache);
        assert!(
            cache.contains(TileCoord::new(2, 0)),
            "tile in hysteresis band should stay loaded"
        );

        streamer.tick(TileCoord::new(-3, 0), &mut cache);
        assert!(
            !cache.contains(TileCoord::new(2, 0)),
            "tile beyond unload radius should be unloaded"
        );
    }

    #[test]
    fn test_stale_queue_entries_skipped() {
        let config = StreamConfig {
            loads_per_tick: 1,
            ..unlimited(2, 4)
        };
        let mut streamer = TileStreamer::new(config);
        let mut cache = cache();
        streamer.tick(TileCoord::new(0, 0), &mut cache);
        // Jump far away; everything queued near the origin is now stale.
        let far = TileCoord::new(100, 100);
        let tick = streamer.tick(far, &mut cache);
        assert_eq!(tick.loaded, vec![far]);
    }

    #[test]
    fn test_unload_radius_forced_above_load_radius() {
        let streamer = TileStreamer::new(unlimited(4, 2));
        assert_eq!(streamer.config().unload_radius, 5);
    }

    #[test]
    fn test_load_radius_clamped() {
        let streamer = TileStreamer::new(unlimited(100_000, 100_002));
        assert_eq!(streamer.config().load_radius, MAX_LOAD_RADIUS);
        assert_eq!(streamer.config().unload_radius, 100_002);

        let streamer = TileStreamer::new(unlimited(u32::MAX, u32::MAX));
        assert_eq!(streamer.config().load_radius, MAX_LOAD_RADIUS);
        assert_eq!(streamer.config().unload_radius, u32::MAX);
    }

    #[test]
    fn test_huge_radius_tick_is_bounded() {
        let config = StreamConfig {
            loads_per_tick: 1,
            ..unlimited(100_000, 100_002)
        };
        let mut streamer = TileStreamer::new(config);
        let mut cache = cache();
        let tick = streamer.tick(TileCoord::new(0, 0), &mut cache);
        assert_eq!(tick.loaded.len(), 1);
        let r = i64::from(MAX_LOAD_RADIUS);
        let disc = (-r..=r)
            .flat_map(|dx| (-r..=r).map(move |dy| dx * dx + dy * dy))
            .filter(|&d| d <= r * r)
            .count();
        assert_eq!(tick.pending, disc - 1);
    }

    #[test]
    fn test_idle_tick_reports_no_change() {
        let mut streamer = TileStreamer::new(unlimited(1, 3));
        let mut cache = cache();
        assert!(streamer.tick(TileCoord::new(0, 0), &mut cache).changed());
        assert!(!streamer.tick(TileCoord::new(0, 0), &mut cache).changed());
    }
}

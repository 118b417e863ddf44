//! The streamed world around one viewer.
//!
//! [`WorldSession`] wires the generation, streaming, LOD and batching crates
//! together. Each [`tick`](WorldSession::tick) streams tiles around the
//! viewer, re-selects tiers when the movement gate opens or the tile set
//! changed, and rebuilds instance batches only when their key changed.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use mirage_config::Config;
use mirage_instancing::{
    BatchCache, BatchPlan, InstanceBatchPlanner, PlanKey, collect_instances,
    collect_world_instances, feature_class_of,
};
use mirage_lod::{FeatureClass, LodProfile, LodTier, MovementGate, viewer_distance};
use mirage_procgen::{
    DistrictGenerator, DistrictLayout, EntityDescriptor, FlatGround, HeightmapParams,
    HorizonParams, NoiseHeightmap, PatternClassifier, TileCoord, generate_horizon,
};
use mirage_world::{LayoutCache, StreamConfig, TileStreamer};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::AppError;

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickSummary {
    /// Tile under the viewer.
    pub viewer_tile: TileCoord,
    /// Tiles generated this tick.
    pub loaded: usize,
    /// Tiles released this tick.
    pub unloaded: usize,
    /// Tiles still queued.
    pub pending: usize,
    /// Tiles resident after the tick.
    pub resident: usize,
    /// Entities across resident tiles and the horizon.
    pub entities: usize,
    /// Whether tiers were re-selected.
    pub reselected: bool,
    /// Entities whose tier changed or was assigned for the first time.
    pub tier_changes: usize,
    /// Whether the batch plan was rebuilt.
    pub rebuilt: bool,
    /// Batches in the current plan.
    pub batches: usize,
    /// Instances in the current plan.
    pub instances: usize,
}

/// Generation, streaming, LOD and batching state for one viewer.
pub struct WorldSession {
    cache: LayoutCache,
    streamer: TileStreamer,
    tile_size: f32,
    profile: LodProfile,
    hysteresis_margin: f32,
    gate: MovementGate,
    horizon_params: HorizonParams,
    horizon: Vec<EntityDescriptor>,
    planner: InstanceBatchPlanner,
    batches: BatchCache,
    tiers: FxHashMap<TileCoord, Vec<LodTier>>,
    horizon_tiers: Vec<LodTier>,
    lod_epoch: u64,
}

impl WorldSession {
    /// Build a session from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Lod`] if any configured band is rejected.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let g = &config.generation;
        let generator = if g.heightmap {
            DistrictGenerator::new(NoiseHeightmap::new(HeightmapParams {
                seed: g.heightmap_seed,
                octaves: g.heightmap_octaves,
                base_frequency: g.heightmap_frequency,
                amplitude: g.heightmap_amplitude,
                base_height: f64::from(g.ground_level),
                ..HeightmapParams::default()
            }))
        } else {
            DistrictGenerator::new(FlatGround(g.ground_level))
        }
        .with_tile_size(g.tile_size);

        let lod = &config.lod;
        let profile = LodProfile::from_bands(|class| match class {
            FeatureClass::Landmark => lod.landmark,
            FeatureClass::Building => lod.building,
            FeatureClass::Vegetation => lod.vegetation,
            FeatureClass::Prop => lod.prop,
            FeatureClass::Skyline => lod.skyline,
        })?;

        let s = &config.streaming;
        let streamer = TileStreamer::new(StreamConfig {
            load_radius: s.load_radius,
            unload_radius: s.unload_radius,
            loads_per_tick: s.loads_per_tick,
            unloads_per_tick: s.unloads_per_tick,
        });

        let b = &config.batching;
        let horizon_params = HorizonParams {
            count: b.horizon_count,
            radius: b.horizon_radius,
            tree_fraction: b.horizon_tree_fraction,
            ..HorizonParams::default()
        };

        let tile_size = generator.tile_size();
        let horizon = generate_horizon(
            g.session_seed,
            &horizon_params,
            Vec2::ZERO,
            generator.heights(),
        );
        let cache = LayoutCache::new(generator, PatternClassifier, g.session_seed);

        info!(
            session_seed = g.session_seed,
            tile_size,
            heightmap = g.heightmap,
            horizon = horizon.len(),
            "world session created"
        );

        Ok(Self {
            cache,
            streamer,
            tile_size,
            profile,
            hysteresis_margin: lod.hysteresis_margin,
            gate: MovementGate::new(lod.gate_distance),
            horizon_params,
            horizon,
            planner: InstanceBatchPlanner::new(b.max_instances_per_batch),
            batches: BatchCache::new(),
            tiers: FxHashMap::default(),
            horizon_tiers: Vec::new(),
            lod_epoch: 0,
        })
    }

    /// Advance the world for a viewer at `viewer`.
    pub fn tick(&mut self, viewer: Vec3) -> TickSummary {
        let viewer_tile = TileCoord::containing(viewer.x, viewer.z, self.tile_size);
        let stream = self.streamer.tick(viewer_tile, &mut self.cache);
        for tile in &stream.unloaded {
            self.tiers.remove(tile);
        }

        let gate_open = self.gate.should_update(viewer);
        let reselected = gate_open || stream.changed();
        let tier_changes = if reselected { self.reselect(viewer) } else { 0 };
        if tier_changes > 0 {
            self.lod_epoch += 1;
        }

        let entities = self.cache.entity_count() + self.horizon.len();
        let key = PlanKey::new(
            self.cache.loaded_tiles(),
            self.cache.session_seed(),
            entities,
            self.lod_epoch,
        );
        let rebuilds_before = self.batches.rebuilds();
        let plan = self.batches.get_or_rebuild(key, || {
            build_plan(
                &self.planner,
                &self.cache,
                &self.tiers,
                &self.horizon,
                &self.horizon_tiers,
                self.tile_size,
            )
        });
        let (batch_count, instances) = (plan.len(), plan.instance_count());

        TickSummary {
            viewer_tile,
            loaded: stream.loaded.len(),
            unloaded: stream.unloaded.len(),
            pending: stream.pending,
            resident: self.cache.len(),
            entities,
            reselected,
            tier_changes,
            rebuilt: self.batches.rebuilds() > rebuilds_before,
            batches: batch_count,
            instances,
        }
    }

    /// Assign tiers to every resident entity. Returns how many changed.
    fn reselect(&mut self, viewer: Vec3) -> usize {
        let tile_size = self.tile_size;
        let mut changed = 0;
        for layout in self.cache.layouts() {
            let origin = layout.tile().center_3d(tile_size);
            let memory = self.tiers.entry(layout.tile()).or_default();
            changed += assign_tiers(
                &self.profile,
                self.hysteresis_margin,
                viewer,
                layout.entities().iter().map(|e| (e, origin + e.position)),
                memory,
            );
        }
        changed += assign_tiers(
            &self.profile,
            self.hysteresis_margin,
            viewer,
            self.horizon.iter().map(|e| (e, e.position)),
            &mut self.horizon_tiers,
        );
        debug!(changed, epoch = self.lod_epoch, "LOD re-selected");
        changed
    }

    /// Switch to a new session seed.
    ///
    /// Every cached layout, tier and batch is discarded and the horizon is
    /// regenerated. Returns the number of layouts dropped.
    pub fn reseed(&mut self, session_seed: u64) -> usize {
        if session_seed == self.cache.session_seed() {
            return 0;
        }
        let dropped = self.cache.set_session_seed(session_seed);
        self.streamer.reset();
        self.tiers.clear();
        self.horizon = generate_horizon(
            session_seed,
            &self.horizon_params,
            Vec2::ZERO,
            self.cache.generator().heights(),
        );
        self.horizon_tiers.clear();
        self.gate.reset();
        self.batches.invalidate();
        info!(session_seed, dropped, "session reseeded");
        dropped
    }

    /// The layout for `tile` under the current seed, generating it if needed.
    pub fn layout(&mut self, tile: TileCoord) -> Arc<DistrictLayout> {
        self.cache.get_or_generate(tile)
    }

    /// The layout for `tile` as pretty-printed RON.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dump`] if serialization fails.
    pub fn dump_tile(&mut self, tile: TileCoord) -> Result<String, AppError> {
        let layout = self.layout(tile);
        Ok(ron::ser::to_string_pretty(
            layout.as_ref(),
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// The layout cache.
    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    /// The current batch plan.
    pub fn plan(&self) -> &BatchPlan {
        self.batches.plan()
    }

    /// Number of times the batch plan was built.
    pub fn rebuilds(&self) -> u64 {
        self.batches.rebuilds()
    }

    /// Tier assignment generation.
    pub fn lod_epoch(&self) -> u64 {
        self.lod_epoch
    }

    /// Tiers assigned to `tile`'s entities, in entity order.
    pub fn tiers(&self, tile: TileCoord) -> Option<&[LodTier]> {
        self.tiers.get(&tile).map(Vec::as_slice)
    }

    /// Horizon silhouettes, in world space.
    pub fn horizon(&self) -> &[EntityDescriptor] {
        &self.horizon
    }

    /// Tile edge length in world units.
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

fn assign_tiers<'a>(
    profile: &LodProfile,
    margin: f32,
    viewer: Vec3,
    entities: impl Iterator<Item = (&'a EntityDescriptor, Vec3)>,
    memory: &mut Vec<LodTier>,
) -> usize {
    let previous = std::mem::take(memory);
    let mut changed = 0;
    memory.extend(entities.enumerate().map(|(i, (entity, position))| {
        let prev = previous.get(i).copied();
        let tier = profile.select_with_hysteresis(
            feature_class_of(entity.category()),
            viewer_distance(Some(viewer), position),
            prev,
            margin,
        );
        if prev != Some(tier) {
            changed += 1;
        }
        tier
    }));
    changed
}

fn build_plan(
    planner: &InstanceBatchPlanner,
    cache: &LayoutCache,
    tiers: &FxHashMap<TileCoord, Vec<LodTier>>,
    horizon: &[EntityDescriptor],
    horizon_tiers: &[LodTier],
    tile_size: f32,
) -> BatchPlan {
    // Tile order fixes transform order within each batch.
    let mut layouts: Vec<&Arc<DistrictLayout>> = cache.layouts().collect();
    layouts.sort_by_key(|layout| layout.tile());

    let mut requests = Vec::new();
    for layout in layouts {
        let assigned = tiers.get(&layout.tile()).map(Vec::as_slice).unwrap_or(&[]);
        let mut next = assigned.iter().copied();
        requests.extend(collect_instances(
            layout,
            layout.tile().center_3d(tile_size),
            |_, _| next.next().unwrap_or(LodTier::COARSEST),
        ));
    }
    let mut next = horizon_tiers.iter().copied();
    requests.extend(collect_world_instances(horizon, |_, _| {
        next.next().unwrap_or(LodTier::COARSEST)
    }));
    planner.plan(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_lod::FeatureClass;
    use mirage_procgen::EntityCategory;

    fn config() -> Config {
        let mut config = Config::default();
        config.generation.heightmap = false;
        config.streaming.load_radius = 1;
        config.streaming.unload_radius = 3;
        config.streaming.loads_per_tick = 100;
        config.batching.horizon_count = 24;
        config
    }

    fn session() -> WorldSession {
        WorldSession::from_config(&config()).unwrap()
    }

    #[test]
    fn test_first_tick_loads_and_plans() {
        let mut session = session();
        let viewer = TileCoord::new(0, 2).center_3d(session.tile_size());
        let summary = session.tick(viewer);
        assert_eq!(summary.viewer_tile, TileCoord::new(0, 2));
        assert_eq!(summary.loaded, 5, "radius 1 covers the tile and its 4 neighbours");
        assert!(summary.reselected);
        assert!(summary.rebuilt);
        assert_eq!(summary.instances, summary.entities);
        assert_eq!(session.plan().instance_count(), summary.entities);
    }

    #[test]
    fn test_stationary_viewer_reuses_plan() {
        let mut session = session();
        let viewer = Vec3::new(3.0, 1.7, 130.0);
        session.tick(viewer);
        let rebuilds = session.rebuilds();
        for _ in 0..50 {
            let s = session.tick(viewer);
            assert!(!s.rebuilt, "unchanged inputs must not rebuild");
        }
        assert_eq!(session.rebuilds(), rebuilds);
    }

    #[test]
    fn test_small_moves_do_not_reselect() {
        let mut session = session();
        let start = Vec3::new(0.0, 1.7, 128.0);
        session.tick(start);
        let epoch = session.lod_epoch();
        let summary = session.tick(start + Vec3::new(0.5, 0.0, 0.0));
        assert!(!summary.reselected, "movement below the gate distance");
        assert_eq!(session.lod_epoch(), epoch);
    }

    #[test]
    fn test_landmark_tier_follows_distance() {
        let mut session = session();
        let tile = TileCoord::new(0, 2);
        let centre = tile.center_3d(session.tile_size());
        session.tick(centre + Vec3::Y);
        let layout = session.cache().get(tile).unwrap().clone();
        let landmark = layout
            .entities()
            .iter()
            .position(|e| e.category() == EntityCategory::Landmark)
            .unwrap();
        assert_eq!(session.tiers(tile).unwrap()[landmark], LodTier::Close);

        // Walk 120 units north, still inside the unload radius.
        session.tick(centre + Vec3::new(0.0, 1.0, 120.0));
        assert_eq!(
            session.tiers(tile).unwrap()[landmark],
            LodTier::Far,
            "landmark bands are 30/80/200"
        );
    }

    #[test]
    fn test_horizon_is_silhouette_class() {
        let mut session = session();
        session.tick(Vec3::new(0.0, 1.7, 0.0));
        assert_eq!(session.horizon().len(), 24);
        assert!(
            session
                .horizon()
                .iter()
                .all(|e| feature_class_of(e.category()) == FeatureClass::Skyline)
        );
        let skyline: usize = session
            .plan()
            .batches()
            .iter()
            .filter(|b| b.geometry.category == EntityCategory::Silhouette)
            .map(|b| b.instance_count() as usize)
            .sum();
        assert_eq!(skyline, 24);
    }

    #[test]
    fn test_reseed_discards_everything() {
        let mut session = session();
        let viewer = Vec3::new(0.0, 1.7, 128.0);
        session.tick(viewer);
        let before: Vec<EntityDescriptor> = session.horizon().to_vec();
        let dropped = session.reseed(4242);
        assert_eq!(dropped, 5);
        assert!(session.cache().is_empty());
        assert!(session.plan().is_empty());
        assert_ne!(session.horizon(), &before[..]);

        let summary = session.tick(viewer);
        assert_eq!(summary.loaded, 5);
        assert!(summary.rebuilt);
        assert_eq!(
            session.cache().get(TileCoord::new(0, 2)).unwrap().session_seed(),
            4242
        );
    }

    #[test]
    fn test_dump_tile_is_ron() {
        let mut session = session();
        let text = session.dump_tile(TileCoord::new(0, 2)).unwrap();
        assert!(text.contains("Mosque"));
        assert!(text.contains("Landmark"));
    }

    #[test]
    fn test_invalid_lod_bands_rejected() {
        let mut config = config();
        config.lod.prop = [10.0, 5.0, 70.0];
        assert!(matches!(
            WorldSession::from_config(&config),
            Err(AppError::Lod(_))
        ));
    }
}

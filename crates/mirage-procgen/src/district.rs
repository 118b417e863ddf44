//! Per-tile district generation.
//!
//! [`DistrictGenerator::generate`] is total and pure: for a given tile,
//! district type and session seed it always returns the same layout, and it
//! never fails. Tiles outside the supported range and unclassified districts
//! yield an empty layout.
//!
//! Each category draws from its own [`Purpose`] stream, and each placed item
//! from a fork of that stream keyed by its slot, so no category's content
//! depends on how many items another category placed.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::heightmap::{DEFAULT_GROUND_LEVEL, FlatGround, HeightSampler, ground_level};
use crate::layout::{
    AwningStyle, CropKind, DistrictLayout, DomeShape, DoorStyle, EntityCategory, EntityDescriptor,
    EntityStyle, Goods, LinearFeature, LinearKind, PALETTE_COUNT, PropKind, StyleChoice, TreeKind,
};
use crate::placement::{
    ExclusionZone, Facing, GridParams, GridRotation, LineParams, Placement, RejectPolicy,
    RingParams, grid_with_rejection, line_posts, radial_ring,
};
use crate::seed::{Purpose, SeedStream};
use crate::tile::{
    DEFAULT_TILE_SIZE, DistrictClassifier, DistrictType, TileCoord, sanitize_tile_size,
};

/// Half-extent of the area districts lay content out in, tile-local.
pub const LAYOUT_HALF_EXTENT: f32 = 30.0;

/// Buildings in the ring around a mosque.
pub const PERIMETER_BUILDINGS: u32 = 16;
/// Nominal radius of the perimeter ring.
pub const PERIMETER_RADIUS: f32 = 27.5;
/// Maximum radial deviation of perimeter buildings in world units.
pub const PERIMETER_RADIUS_SPREAD: f32 = 2.5;
/// Minarets around a mosque landmark.
pub const MINARET_COUNT: u8 = 4;
/// Radius of the minaret ring.
pub const MINARET_RADIUS: f32 = 9.0;
/// Probability that a farmland tile hosts a nomadic camp.
pub const NOMAD_CAMP_CHANCE: f32 = 0.3;

// Offsets into an item's forked stream. Placement uses 0..=5.
const VARIANT_DRAW: u64 = 8;
const SCALE_DRAW: u64 = 9;
const STYLE_DRAW: u64 = 10;

/// Builds [`DistrictLayout`]s for tiles.
pub struct DistrictGenerator {
    heights: Box<dyn HeightSampler>,
    tile_size: f32,
}

impl Default for DistrictGenerator {
    fn default() -> Self {
        Self::new(FlatGround(DEFAULT_GROUND_LEVEL))
    }
}

impl DistrictGenerator {
    /// A generator sampling elevation from `heights`, with the default tile size.
    pub fn new(heights: impl HeightSampler + 'static) -> Self {
        Self {
            heights: Box::new(heights),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Override the tile edge length. Invalid sizes fall back to the default.
    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = sanitize_tile_size(tile_size);
        self
    }

    /// Tile edge length in world units.
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// The height sampler used for entity elevation.
    pub fn heights(&self) -> &dyn HeightSampler {
        self.heights.as_ref()
    }

    /// Generate the layout for `tile` as `district` under `session_seed`.
    pub fn generate(
        &self,
        tile: TileCoord,
        district: DistrictType,
        session_seed: u64,
    ) -> DistrictLayout {
        if !tile.is_supported() {
            debug!(%tile, "tile outside supported range, returning empty layout");
            return DistrictLayout::empty(tile, district, session_seed);
        }

        let mut b = LayoutBuilder {
            tile,
            session_seed,
            origin: tile.center(self.tile_size),
            heights: self.heights.as_ref(),
            entities: Vec::new(),
            features: Vec::new(),
            rare_feature: None,
        };

        match district {
            DistrictType::Mosque => build_mosque(&mut b),
            DistrictType::Bazaar => build_bazaar(&mut b),
            DistrictType::Residential => build_residential(&mut b),
            DistrictType::Farmland => build_farmland(&mut b),
            DistrictType::Orchard => build_orchard(&mut b),
            DistrictType::Unclassified => {}
        }

        let layout = b.finish(district);
        debug!(
            %tile,
            ?district,
            entities = layout.entities().len(),
            features = layout.features().len(),
            "generated district layout"
        );
        layout
    }

    /// Classify `tile` and generate it.
    pub fn generate_classified(
        &self,
        tile: TileCoord,
        classifier: &dyn DistrictClassifier,
        session_seed: u64,
    ) -> DistrictLayout {
        self.generate(tile, classifier.classify(tile), session_seed)
    }
}

struct LayoutBuilder<'a> {
    tile: TileCoord,
    session_seed: u64,
    origin: Vec2,
    heights: &'a dyn HeightSampler,
    entities: Vec<EntityDescriptor>,
    features: Vec<LinearFeature>,
    rare_feature: Option<bool>,
}

impl LayoutBuilder<'_> {
    fn stream(&self, purpose: Purpose) -> SeedStream {
        self.tile.stream(self.session_seed, purpose)
    }

    fn lift(&self, local: Vec2) -> Vec3 {
        let world = self.origin + local;
        Vec3::new(local.x, ground_level(self.heights, world.x, world.y), local.y)
    }

    fn push(&mut self, style: EntityStyle, at: Vec2, rotation: f32, scale: f32, variant: u16) {
        let position = self.lift(at);
        self.entities.push(EntityDescriptor {
            style,
            position,
            rotation,
            scale,
            variant,
        });
    }

    /// Push one entity per placement; `style` picks parameters from the
    /// item's forked stream.
    fn place_all(
        &mut self,
        placements: &[Placement],
        stream: SeedStream,
        scale: (f32, f32),
        style: impl Fn(SeedStream) -> EntityStyle,
    ) {
        for p in placements {
            let item = stream.fork(u64::from(p.slot));
            let style = style(item);
            let variant = item.pick(VARIANT_DRAW, usize::from(style.category().variant_count()));
            let scale = item.range(SCALE_DRAW, scale.0, scale.1);
            self.push(style, p.position, p.rotation, scale, variant as u16);
        }
    }

    fn line(&mut self, kind: LinearKind, points: &[Vec2], width: f32) {
        let points = points.iter().map(|&p| self.lift(p)).collect();
        self.features.push(LinearFeature {
            kind,
            points,
            width,
        });
    }

    fn finish(self, district: DistrictType) -> DistrictLayout {
        DistrictLayout::new(
            self.tile,
            district,
            self.session_seed,
            self.entities,
            self.features,
            self.rare_feature,
        )
    }
}

fn palette(item: SeedStream, offset: u64) -> u8 {
    item.pick(offset, usize::from(PALETTE_COUNT)) as u8
}

fn building_style(item: SeedStream, max_storeys: u8) -> EntityStyle {
    EntityStyle::Building {
        door: DoorStyle::pick(item.seed(STYLE_DRAW)),
        palette: palette(item, STYLE_DRAW + 1),
        storeys: 1 + item.pick(STYLE_DRAW + 2, usize::from(max_storeys)) as u8,
    }
}

/// A straight channel across the tile along X or Z, offset from the centre
/// by up to `max_offset`. Returns `(start, end)`.
fn straight_channel(stream: SeedStream, max_offset: f32) -> (Vec2, Vec2) {
    let offset = stream.range(1, -max_offset, max_offset);
    let h = LAYOUT_HALF_EXTENT + 2.0;
    if stream.chance(0, 0.5) {
        (Vec2::new(-h, offset), Vec2::new(h, offset))
    } else {
        (Vec2::new(offset, -h), Vec2::new(offset, h))
    }
}

fn corridor((start, end): (Vec2, Vec2), half_width: f32) -> ExclusionZone {
    ExclusionZone::Corridor {
        start,
        end,
        half_width,
    }
}

fn footprints(placements: &[Placement], radius: f32) -> impl Iterator<Item = ExclusionZone> + '_ {
    placements.iter().map(move |p| ExclusionZone::Circle {
        center: p.position,
        radius,
    })
}

// ---------------------------------------------------------------------------
// Mosque quarter
// ---------------------------------------------------------------------------

fn build_mosque(b: &mut LayoutBuilder<'_>) {
    let landmark = b.stream(Purpose::Landmark);
    let minarets = MINARET_COUNT;
    let variant = landmark.pick(VARIANT_DRAW, usize::from(EntityCategory::Landmark.variant_count()));
    b.push(
        EntityStyle::Landmark {
            dome: DomeShape::pick(landmark.seed(0)),
            minarets,
        },
        Vec2::ZERO,
        landmark.pick(2, 4) as f32 * FRAC_PI_2,
        1.0,
        variant as u16,
    );

    // Minarets stand on the diagonals, all with the same number of tiers.
    let tiers = 2 + landmark.pick(1, 2) as u8;
    let minaret_stream = b.stream(Purpose::Minarets);
    let ring = RingParams::new(u32::from(minarets), MINARET_RADIUS)
        .with_angle_offset(TAU / 8.0)
        .with_jitter(0.02, 0.02)
        .with_facing(Facing::Outward);
    let placed = radial_ring(ring, minaret_stream, &[], RejectPolicy::Skip);
    b.place_all(&placed, minaret_stream, (1.0, 1.0), |_| EntityStyle::Minaret {
        tiers,
    });

    // Perimeter ring. No exclusion zones, so all 16 buildings are always
    // placed; the courtyard paths run through half-step gaps and may clip a
    // strongly jittered building.
    let perimeter = b.stream(Purpose::Perimeter);
    let step = TAU / PERIMETER_BUILDINGS as f32;
    let offset = perimeter.range(0, 0.0, step);
    let ring = RingParams::new(PERIMETER_BUILDINGS, PERIMETER_RADIUS)
        .with_angle_offset(offset)
        .with_jitter(0.25, PERIMETER_RADIUS_SPREAD / PERIMETER_RADIUS)
        .with_facing(Facing::Inward);
    let placed = radial_ring(ring, perimeter, &[], RejectPolicy::Skip);
    b.place_all(&placed, perimeter, (0.9, 1.1), |item| building_style(item, 2));

    // Four courtyard paths from the minaret ring to the tile edge.
    for k in 0..4u32 {
        let angle = offset + (4 * k) as f32 * step + step * 0.5;
        let dir = Vec2::new(libm::cosf(angle), libm::sinf(angle));
        b.line(
            LinearKind::Path,
            &[dir * (MINARET_RADIUS + 2.0), dir * (LAYOUT_HALF_EXTENT + 2.0)],
            2.0,
        );
        if k == 0 {
            // Ablution fountain on the main axis.
            b.push(EntityStyle::Well, dir * 17.0, angle, 1.0, 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Bazaar
// ---------------------------------------------------------------------------

fn build_bazaar(b: &mut LayoutBuilder<'_>) {
    let paths = b.stream(Purpose::Paths);
    let plaza = Vec2::new(paths.range(0, -4.0, 4.0), paths.range(1, -4.0, 4.0));
    let h = LAYOUT_HALF_EXTENT + 2.0;
    let lane_x = (Vec2::new(-h, plaza.y), Vec2::new(h, plaza.y));
    let lane_z = (Vec2::new(plaza.x, -h), Vec2::new(plaza.x, h));
    b.line(LinearKind::Path, &[lane_x.0, lane_x.1], 4.0);
    b.line(LinearKind::Path, &[lane_z.0, lane_z.1], 4.0);
    b.push(EntityStyle::Well, plaza, 0.0, 1.2, 1);

    let zones = [
        corridor(lane_x, 3.0),
        corridor(lane_z, 3.0),
        ExclusionZone::Circle {
            center: plaza,
            radius: 5.0,
        },
    ];

    // Stalls on the lanes or the plaza are dropped.
    let shops = b.stream(Purpose::Shops);
    let grid = GridParams::new(
        Vec2::splat(-LAYOUT_HALF_EXTENT),
        Vec2::splat(LAYOUT_HALF_EXTENT),
        6.0,
    )
    .with_density(0.8)
    .with_jitter(0.25)
    .with_rotation(GridRotation::QuarterTurns);
    let stalls = grid_with_rejection(grid, shops, &zones, RejectPolicy::Skip);
    b.place_all(&stalls, shops, (0.9, 1.1), |item| EntityStyle::Shop {
        awning: AwningStyle::pick(item.seed(STYLE_DRAW)),
        goods: Goods::pick(item.seed(STYLE_DRAW + 1)),
        palette: palette(item, STYLE_DRAW + 2),
    });

    // Props are pushed out from under stalls and may end up on the lanes.
    let stall_zones: Vec<ExclusionZone> = footprints(&stalls, 2.2).collect();
    let scatter = b.stream(Purpose::Scatter);
    let grid = GridParams::new(
        Vec2::splat(-LAYOUT_HALF_EXTENT),
        Vec2::splat(LAYOUT_HALF_EXTENT),
        4.0,
    )
    .with_density(0.2)
    .with_jitter(0.9)
    .with_rotation(GridRotation::Seeded);
    let props = grid_with_rejection(grid, scatter, &stall_zones, RejectPolicy::ClampOutward);
    b.place_all(&props, scatter, (0.8, 1.2), |item| EntityStyle::Prop {
        kind: PropKind::pick(item.seed(STYLE_DRAW)),
    });
}

// ---------------------------------------------------------------------------
// Residential
// ---------------------------------------------------------------------------

fn build_residential(b: &mut LayoutBuilder<'_>) {
    let canal = straight_channel(b.stream(Purpose::Canals), 10.0);
    b.line(LinearKind::Canal, &[canal.0, canal.1], 4.0);

    // The lane runs perpendicular to the canal.
    let paths = b.stream(Purpose::Paths);
    let along_x = canal.0.y == canal.1.y;
    let offset = paths.range(0, -12.0, 12.0);
    let h = LAYOUT_HALF_EXTENT + 2.0;
    let lane = if along_x {
        (Vec2::new(offset, -h), Vec2::new(offset, h))
    } else {
        (Vec2::new(-h, offset), Vec2::new(h, offset))
    };
    b.line(LinearKind::Path, &[lane.0, lane.1], 3.0);

    // Houses never sit in the canal or on the lane.
    let zones = [corridor(canal, 3.5), corridor(lane, 2.0)];
    let houses = b.stream(Purpose::Houses);
    let grid = GridParams::new(
        Vec2::splat(-LAYOUT_HALF_EXTENT),
        Vec2::splat(LAYOUT_HALF_EXTENT),
        8.5,
    )
    .with_density(0.75)
    .with_jitter(0.25)
    .with_rotation(GridRotation::QuarterTurns);
    let placed = grid_with_rejection(grid, houses, &zones, RejectPolicy::Skip);
    b.place_all(&placed, houses, (0.9, 1.15), |item| building_style(item, 3));

    // Street palms are pushed out of house footprints and the water; they may
    // end up on the lane.
    let mut tree_zones: Vec<ExclusionZone> = footprints(&placed, 3.0).collect();
    tree_zones.push(corridor(canal, 2.5));
    let trees = b.stream(Purpose::Trees);
    let grid = GridParams::new(
        Vec2::splat(-LAYOUT_HALF_EXTENT),
        Vec2::splat(LAYOUT_HALF_EXTENT),
        10.0,
    )
    .with_density(0.3)
    .with_jitter(0.9)
    .with_rotation(GridRotation::Seeded);
    let palms = grid_with_rejection(grid, trees, &tree_zones, RejectPolicy::ClampOutward);
    b.place_all(&palms, trees, (0.85, 1.15), |item| EntityStyle::Tree {
        kind: if item.chance(STYLE_DRAW, 0.7) {
            TreeKind::DatePalm
        } else {
            TreeKind::Fig
        },
    });
}

// ---------------------------------------------------------------------------
// Farmland
// ---------------------------------------------------------------------------

const FIELD_QUADRANTS: [(Vec2, Vec2); 4] = [
    (Vec2::new(-30.0, -30.0), Vec2::new(-3.0, -3.0)),
    (Vec2::new(3.0, -30.0), Vec2::new(30.0, -3.0)),
    (Vec2::new(3.0, 3.0), Vec2::new(30.0, 30.0)),
    (Vec2::new(-30.0, 3.0), Vec2::new(-3.0, 30.0)),
];
const CROP_SPACING: f32 = 2.5;
const FENCE_SPACING: f32 = 3.0;
const TENT_RADIUS: f32 = 22.0;
const CANAL_CLEARANCE: f32 = 2.5;
const FARMHOUSE_CLEARANCE: f32 = 4.5;
const TENT_CLEARANCE: f32 = 4.0;

fn build_farmland(b: &mut LayoutBuilder<'_>) {
    let canal = straight_channel(b.stream(Purpose::Canals), 6.0);
    b.line(LinearKind::Canal, &[canal.0, canal.1], 3.0);
    let canal_zone = corridor(canal, CANAL_CLEARANCE);

    // The one and only presence draw for the nomadic camp. It is stored in
    // the layout and never re-rolled.
    let rare = b.stream(Purpose::RareFeature);
    let has_tent = rare.chance(0, NOMAD_CAMP_CHANCE);
    b.rare_feature = Some(has_tent);
    trace!(tile = %b.tile, has_tent, "rolled nomadic camp");

    let crops = b.stream(Purpose::Crops);
    let field_count = 2 + crops.pick(0, 3);
    let first = crops.pick(1, FIELD_QUADRANTS.len());
    let fields: Vec<(Vec2, Vec2)> = (0..field_count)
        .map(|i| FIELD_QUADRANTS[(first + i) % FIELD_QUADRANTS.len()])
        .collect();

    // Farmhouse in the first free quadrant, or at the centre crossing when
    // every quadrant is a field. Either way it is pushed off the canal.
    let farmhouse_at = if field_count < FIELD_QUADRANTS.len() {
        let (min, max) = FIELD_QUADRANTS[(first + field_count) % FIELD_QUADRANTS.len()];
        (min + max) * 0.5
    } else {
        Vec2::ZERO
    };
    let farmhouse_at = canal_zone.push_outside(farmhouse_at);
    let houses = b.stream(Purpose::Houses);
    b.push(
        building_style(houses, 2),
        farmhouse_at,
        houses.pick(0, 4) as f32 * FRAC_PI_2,
        1.0,
        houses.pick(VARIANT_DRAW, usize::from(EntityCategory::Building.variant_count())) as u16,
    );

    let mut zones = vec![
        canal_zone,
        ExclusionZone::Circle {
            center: farmhouse_at,
            radius: FARMHOUSE_CLEARANCE,
        },
    ];

    if has_tent {
        let angle = rare.range(1, 0.0, TAU);
        let at = canal_zone.push_outside(
            Vec2::new(libm::cosf(angle), libm::sinf(angle)) * TENT_RADIUS,
        );
        b.push(
            EntityStyle::Tent {
                palette: palette(rare, 2),
            },
            at,
            rare.range(3, 0.0, TAU),
            rare.range(4, 0.9, 1.1),
            rare.pick(VARIANT_DRAW, usize::from(EntityCategory::Tent.variant_count())) as u16,
        );
        zones.push(ExclusionZone::Circle {
            center: at,
            radius: TENT_CLEARANCE,
        });
    }

    let furrows = b.stream(Purpose::Furrows);
    let fences = b.stream(Purpose::Fences);
    for (i, &(min, max)) in fields.iter().enumerate() {
        let field = crops.fork(i as u64 + 2);
        let kind = CropKind::pick(field.seed(0));

        // Every cell gets a plant; only the canal, the farmhouse yard and the
        // camp remove any.
        let grid = GridParams::new(min, max, CROP_SPACING)
            .with_jitter(0.2)
            .with_rotation(GridRotation::Seeded);
        let plants = grid_with_rejection(grid, field, &zones, RejectPolicy::Skip);
        b.place_all(&plants, field, (0.8, 1.1), |_| EntityStyle::Crop { kind });

        // Furrows follow the crop rows, either along X or along Z. They are
        // not cut at the canal; the renderer draws water over them.
        let (cols, rows) = grid.dimensions();
        let cell = grid.cell_extent();
        let along_x = furrows.fork(i as u64).chance(0, 0.5);
        let lines = if along_x { rows } else { cols };
        for r in 0..lines {
            let t = r as f32 + 0.5;
            let (a, c) = if along_x {
                let y = min.y + t * cell.y;
                (Vec2::new(min.x, y), Vec2::new(max.x, y))
            } else {
                let x = min.x + t * cell.x;
                (Vec2::new(x, min.y), Vec2::new(x, max.y))
            };
            b.line(LinearKind::Furrow, &[a, c], 0.4);
        }

        // Fence just outside the field. Posts that land in the canal are
        // pushed onto the bank.
        let lo = min - Vec2::splat(1.0);
        let hi = max + Vec2::splat(1.0);
        let corners = [lo, Vec2::new(hi.x, lo.y), hi, Vec2::new(lo.x, hi.y)];
        for edge in 0..4 {
            let edge_stream = fences.fork((i * 4 + edge) as u64);
            let params = LineParams {
                start: corners[edge],
                end: corners[(edge + 1) % 4],
                spacing: FENCE_SPACING,
                jitter: 0.1,
            };
            // Skip the last post of each edge; the next edge starts there.
            let mut posts = line_posts(params, edge_stream, &[canal_zone], RejectPolicy::ClampOutward);
            posts.pop();
            b.place_all(&posts, edge_stream, (0.95, 1.05), |_| EntityStyle::FencePost);
        }
        b.line(
            LinearKind::FenceLine,
            &[corners[0], corners[1], corners[2], corners[3], corners[0]],
            0.15,
        );
    }
}

// ---------------------------------------------------------------------------
// Orchard
// ---------------------------------------------------------------------------

const ORCHARD_RING_RADII: [f32; 4] = [8.0, 14.0, 20.0, 26.0];
const ORCHARD_TREE_SPACING: f32 = 5.5;

fn build_orchard(b: &mut LayoutBuilder<'_>) {
    b.push(EntityStyle::Well, Vec2::ZERO, 0.0, 1.0, 0);

    let paths = b.stream(Purpose::Paths);
    let angle = paths.pick(0, 4) as f32 * FRAC_PI_2;
    let dir = Vec2::new(libm::cosf(angle), libm::sinf(angle));
    let access = (dir * 2.0, dir * (LAYOUT_HALF_EXTENT + 2.0));
    b.line(LinearKind::Path, &[access.0, access.1], 2.5);

    // Trees on the access path are dropped, leaving a gap in each ring.
    let zones = [corridor(access, 1.8)];
    let trees = b.stream(Purpose::Trees);
    for (j, &radius) in ORCHARD_RING_RADII.iter().enumerate() {
        let ring_stream = trees.fork(j as u64);
        let kind = TreeKind::pick(ring_stream.seed(0));
        let count = (TAU * radius / ORCHARD_TREE_SPACING).round() as u32;
        let ring = RingParams::new(count, radius)
            .with_angle_offset(ring_stream.range(1, 0.0, TAU))
            .with_jitter(0.15, 0.04)
            .with_facing(Facing::Seeded);
        let placed = radial_ring(ring, ring_stream, &zones, RejectPolicy::Skip);
        b.place_all(&placed, ring_stream, (0.85, 1.15), |_| EntityStyle::Tree { kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::NoHeightmap;
    use crate::placement::is_excluded;

    fn generator() -> DistrictGenerator {
        DistrictGenerator::default()
    }

    #[test]
    fn test_unclassified_is_empty() {
        let layout = generator().generate(TileCoord::new(1, 1), DistrictType::Unclassified, 9);
        assert!(layout.is_empty());
        assert_eq!(layout.district(), DistrictType::Unclassified);
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let layout = generator().generate(
            TileCoord::new(i32::MAX, 0),
            DistrictType::Mosque,
            9,
        );
        assert!(layout.is_empty());
    }

    #[test]
    fn test_every_district_is_deterministic() {
        let g = generator();
        for district in DistrictType::ALL {
            let a = g.generate(TileCoord::new(-4, 7), district, 31);
            let b = g.generate(TileCoord::new(-4, 7), district, 31);
            assert_eq!(a, b, "{district:?} is not reproducible");
        }
    }

    #[test]
    fn test_mosque_has_minarets_matching_landmark() {
        let layout = generator().generate(TileCoord::new(0, 2), DistrictType::Mosque, 77);
        let landmark = layout
            .of_category(EntityCategory::Landmark)
            .next()
            .expect("mosque has a landmark");
        let EntityStyle::Landmark { minarets, .. } = landmark.style else {
            panic!("landmark has the wrong style");
        };
        assert_eq!(layout.count(EntityCategory::Minaret), usize::from(minarets));
        assert_eq!(layout.features_of(LinearKind::Path).count(), 4);
    }

    #[test]
    fn test_bazaar_stalls_avoid_lanes() {
        let layout = generator().generate(TileCoord::new(1, 2), DistrictType::Bazaar, 5);
        let lanes: Vec<ExclusionZone> = layout
            .features_of(LinearKind::Path)
            .map(|f| ExclusionZone::Corridor {
                start: Vec2::new(f.points[0].x, f.points[0].z),
                end: Vec2::new(f.points[1].x, f.points[1].z),
                half_width: 3.0,
            })
            .collect();
        assert_eq!(lanes.len(), 2);
        let shops: Vec<_> = layout.of_category(EntityCategory::Shop).collect();
        assert!(shops.len() > 20, "expected a busy bazaar, got {}", shops.len());
        for shop in shops {
            let at = Vec2::new(shop.position.x, shop.position.z);
            assert!(!is_excluded(&lanes, at), "stall on a lane at {at:?}");
        }
    }

    #[test]
    fn test_residential_houses_avoid_canal() {
        for seed in 0..8 {
            let layout = generator().generate(TileCoord::new(2, 0), DistrictType::Residential, seed);
            let canal = layout
                .features_of(LinearKind::Canal)
                .next()
                .expect("residential tile has a canal");
            let zone = ExclusionZone::Corridor {
                start: Vec2::new(canal.points[0].x, canal.points[0].z),
                end: Vec2::new(canal.points[1].x, canal.points[1].z),
                half_width: 3.5,
            };
            for house in layout.of_category(EntityCategory::Building) {
                assert!(!zone.contains(Vec2::new(house.position.x, house.position.z)));
            }
        }
    }

    #[test]
    fn test_farmland_structure() {
        let layout = generator().generate(TileCoord::new(3, -1), DistrictType::Farmland, 1000);
        assert!(layout.rare_feature().is_some());
        assert_eq!(layout.count(EntityCategory::Building), 1, "one farmhouse");
        assert_eq!(
            layout.count(EntityCategory::Tent),
            usize::from(layout.has_rare_feature())
        );
        assert!(layout.count(EntityCategory::Crop) > 100);
        assert!(layout.count(EntityCategory::FencePost) > 20);
        assert!(layout.features_of(LinearKind::Furrow).count() >= 20);
        assert_eq!(layout.features_of(LinearKind::Canal).count(), 1);
    }

    #[test]
    fn test_crop_fields_match_target_density() {
        let flat = |v: Vec3| Vec2::new(v.x, v.z);
        let target = (27.0 / CROP_SPACING) * (27.0 / CROP_SPACING);
        for seed in [0u64, 1, 7, 42, 1000] {
            let layout = generator().generate(TileCoord::new(3, -1), DistrictType::Farmland, seed);
            let canal = layout
                .features_of(LinearKind::Canal)
                .next()
                .expect("farmland has a canal");
            let mut zones = vec![corridor(
                (flat(canal.points[0]), flat(canal.points[1])),
                CANAL_CLEARANCE,
            )];
            zones.extend(layout.of_category(EntityCategory::Building).map(|e| {
                ExclusionZone::Circle {
                    center: flat(e.position),
                    radius: FARMHOUSE_CLEARANCE,
                }
            }));
            zones.extend(layout.of_category(EntityCategory::Tent).map(|e| {
                ExclusionZone::Circle {
                    center: flat(e.position),
                    radius: TENT_CLEARANCE,
                }
            }));

            let fences: Vec<_> = layout.features_of(LinearKind::FenceLine).collect();
            assert!((2..=4).contains(&fences.len()), "seed {seed}: {} fields", fences.len());
            for fence in fences {
                // The fence runs one unit outside the field.
                let min = flat(fence.points[0]) + Vec2::ONE;
                let max = flat(fence.points[2]) - Vec2::ONE;
                let grid = GridParams::new(min, max, CROP_SPACING);
                let (cols, rows) = grid.dimensions();
                let cells = (cols * rows) as f32;
                assert!(
                    (cells - target).abs() <= target * 0.15,
                    "seed {seed}: {cells} cells vs target {target}"
                );

                let cell = grid.cell_extent();
                let open = (0..cols * rows)
                    .filter(|k| {
                        let (col, row) = ((k % cols) as f32, (k / cols) as f32);
                        let at = min + Vec2::new(col + 0.5, row + 0.5) * cell;
                        !is_excluded(&zones, at)
                    })
                    .count() as f32;
                let crops = layout
                    .of_category(EntityCategory::Crop)
                    .map(|e| flat(e.position))
                    .filter(|p| p.cmpge(min).all() && p.cmple(max).all())
                    .count() as f32;
                assert!(crops <= cells, "seed {seed}: {crops} crops in {cells} cells");
                assert!(
                    (crops - open).abs() <= open * 0.15,
                    "seed {seed}: {crops} crops for {open} open cells of field {min:?}..{max:?}"
                );
            }
        }
    }

    #[test]
    fn test_farmland_camp_appears_on_some_tiles() {
        let g = generator();
        let rolls: Vec<bool> = (0..40)
            .map(|x| {
                g.generate(TileCoord::new(x, -1), DistrictType::Farmland, 42)
                    .has_rare_feature()
            })
            .collect();
        assert!(rolls.iter().any(|&r| r), "no camp in 40 tiles");
        assert!(rolls.iter().any(|&r| !r), "camp on every tile");
    }

    #[test]
    fn test_orchard_trees_keep_off_access_path() {
        for seed in 0..6 {
            let layout = generator().generate(TileCoord::new(4, -2), DistrictType::Orchard, seed);
            let path = layout
                .features_of(LinearKind::Path)
                .next()
                .expect("orchard has an access path");
            let zone = ExclusionZone::Corridor {
                start: Vec2::new(path.points[0].x, path.points[0].z),
                end: Vec2::new(path.points[1].x, path.points[1].z),
                half_width: 1.8,
            };
            let full: u32 = ORCHARD_RING_RADII
                .iter()
                .map(|r| (TAU * r / ORCHARD_TREE_SPACING).round() as u32)
                .sum();
            let trees: Vec<_> = layout.of_category(EntityCategory::Tree).collect();
            assert!(trees.len() as u32 <= full);
            assert!(trees.len() as u32 > full / 2);
            for t in trees {
                assert!(!zone.contains(Vec2::new(t.position.x, t.position.z)));
            }
            assert_eq!(layout.count(EntityCategory::Well), 1);
        }
    }

    #[test]
    fn test_missing_heightmap_uses_default_ground() {
        let g = DistrictGenerator::new(NoHeightmap);
        let layout = g.generate(TileCoord::new(0, 2), DistrictType::Mosque, 1);
        assert!(
            layout
                .entities()
                .iter()
                .all(|e| e.position.y == DEFAULT_GROUND_LEVEL)
        );
    }

    #[test]
    fn test_heights_follow_sampler() {
        let g = DistrictGenerator::new(FlatGround(12.5));
        let layout = g.generate(TileCoord::new(3, -1), DistrictType::Farmland, 1);
        assert!(layout.entities().iter().all(|e| e.position.y == 12.5));
        assert!(
            layout
                .features()
                .iter()
                .flat_map(|f| f.points.iter())
                .all(|p| p.y == 12.5)
        );
    }

    #[test]
    fn test_variants_within_category_bounds() {
        let g = generator();
        for district in DistrictType::ALL {
            let layout = g.generate(TileCoord::new(6, 8), district, 12);
            for e in layout.entities() {
                assert!(e.variant < e.category().variant_count());
                assert!(e.position.is_finite() && e.rotation.is_finite() && e.scale.is_finite());
            }
        }
    }

    #[test]
    fn test_different_tiles_differ() {
        let g = generator();
        let a = g.generate(TileCoord::new(1, -1), DistrictType::Farmland, 8);
        let b = g.generate(TileCoord::new(2, -1), DistrictType::Farmland, 8);
        assert_ne!(a.entities(), b.entities());
    }

    #[test]
    fn test_invalid_tile_size_falls_back() {
        let g = DistrictGenerator::default().with_tile_size(f32::NAN);
        assert_eq!(g.tile_size(), DEFAULT_TILE_SIZE);
    }
}

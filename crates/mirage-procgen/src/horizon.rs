//! Distant skyline silhouettes.
//!
//! The horizon is a single wide ring of low-detail buildings and trees
//! around a centre point, far outside the streamed tiles. It depends only on
//! the session seed and [`HorizonParams`], never on which tiles are loaded.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::heightmap::{HeightSampler, ground_level};
use crate::layout::{EntityCategory, EntityDescriptor, EntityStyle, SilhouetteShape};
use crate::placement::{Facing, RejectPolicy, RingParams, radial_ring};
use crate::seed::{Purpose, SeedStream, derive_tile_seed};

/// Horizon ring parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonParams {
    /// Number of silhouettes. Default: 96.
    pub count: u32,
    /// Ring radius in world units. Default: 900.
    pub radius: f32,
    /// Radial spread as a fraction of `radius`. Default: 0.15.
    pub radius_jitter: f32,
    /// Fraction of silhouettes that are trees. Default: 0.35.
    pub tree_fraction: f32,
}

impl Default for HorizonParams {
    fn default() -> Self {
        Self {
            count: 96,
            radius: 900.0,
            radius_jitter: 0.15,
            tree_fraction: 0.35,
        }
    }
}

const SHAPE_DRAW: u64 = 8;
const TREE_DRAW: u64 = 9;
const SCALE_DRAW: u64 = 10;
const VARIANT_DRAW: u64 = 11;

const BUILDING_SHAPES: [SilhouetteShape; 3] = [
    SilhouetteShape::Tower,
    SilhouetteShape::Block,
    SilhouetteShape::Dome,
];

/// Place skyline silhouettes around `center` (world XZ).
///
/// Positions are in world space. Silhouettes face the centre.
pub fn generate_horizon(
    session_seed: u64,
    params: &HorizonParams,
    center: Vec2,
    heights: &dyn HeightSampler,
) -> Vec<EntityDescriptor> {
    // The horizon is not tied to a tile; it uses the origin tile's stream.
    let stream = SeedStream::new(derive_tile_seed(0, 0, session_seed, Purpose::Horizon));
    let ring = RingParams::new(params.count, params.radius)
        .with_center(center)
        .with_angle_offset(stream.range(0, 0.0, std::f32::consts::TAU))
        .with_jitter(0.4, params.radius_jitter)
        .with_facing(Facing::Inward);

    let variants = usize::from(EntityCategory::Silhouette.variant_count());
    let silhouettes: Vec<EntityDescriptor> = radial_ring(ring, stream, &[], RejectPolicy::Skip)
        .into_iter()
        .map(|p| {
            let item = stream.fork(u64::from(p.slot));
            let shape = if item.chance(TREE_DRAW, params.tree_fraction) {
                SilhouetteShape::Palm
            } else {
                BUILDING_SHAPES[item.pick(SHAPE_DRAW, BUILDING_SHAPES.len())]
            };
            let y = ground_level(heights, p.position.x, p.position.y);
            EntityDescriptor {
                style: EntityStyle::Silhouette { shape },
                position: Vec3::new(p.position.x, y, p.position.y),
                rotation: p.rotation,
                scale: item.range(SCALE_DRAW, 3.0, 8.0),
                variant: item.pick(VARIANT_DRAW, variants) as u16,
            }
        })
        .collect();

    debug!(count = silhouettes.len(), radius = params.radius, "generated horizon");
    silhouettes
}

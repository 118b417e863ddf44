//! Deterministic procedural content for a tiled desert city: seeded draws,
//! per-tile seed derivation, spatial placement and district generation.

mod district;
mod heightmap;
mod horizon;

pub mod layout;
pub mod placement;
pub mod seed;
pub mod tile;

pub use district::{
    DistrictGenerator, LAYOUT_HALF_EXTENT, MINARET_COUNT, MINARET_RADIUS, NOMAD_CAMP_CHANCE,
    PERIMETER_BUILDINGS, PERIMETER_RADIUS, PERIMETER_RADIUS_SPREAD,
};
pub use heightmap::{
    DEFAULT_GROUND_LEVEL, FlatGround, HeightSampler, HeightmapParams, NoHeightmap,
    NoiseHeightmap, ground_level,
};
pub use horizon::{HorizonParams, generate_horizon};
pub use layout::{
    DistrictLayout, EntityCategory, EntityDescriptor, EntityStyle, LinearFeature, LinearKind,
};
pub use placement::{ExclusionZone, RejectPolicy};
pub use seed::{Purpose, SeedStream, derive_tile_seed};
pub use tile::{DEFAULT_TILE_SIZE, DistrictClassifier, DistrictType, PatternClassifier, TileCoord};

//! Generated layout data: entity descriptors, style variants and linear
//! features.

use glam::Vec3;
use serde::Serialize;

use crate::seed::draw_index;
use crate::tile::{DistrictType, TileCoord};

/// A closed set of style options that can be picked from a seed.
pub trait StyleChoice: Copy + Sized + 'static {
    /// Every option, in a fixed order.
    const ALL: &'static [Self];

    /// Seeded pick.
    fn pick(seed: u64) -> Self {
        Self::ALL[draw_index(seed, Self::ALL.len())]
    }
}

macro_rules! style_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl StyleChoice for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
        }
    };
}

style_enum!(
    /// Dome profile of a landmark.
    DomeShape { Onion, Hemisphere, Ribbed }
);

style_enum!(
    /// Door style of a building.
    DoorStyle { Arched, Square, Keyhole, Double }
);

style_enum!(
    /// Awning over a bazaar stall.
    AwningStyle { Striped, Plain, Scalloped }
);

style_enum!(
    /// What a bazaar stall sells.
    Goods { Spices, Textiles, Pottery, Produce, Lamps }
);

style_enum!(
    /// Crop planted in a field.
    CropKind { Wheat, Barley, Cotton, Melon }
);

style_enum!(
    /// Tree species.
    TreeKind { DatePalm, Olive, Pomegranate, Fig }
);

style_enum!(
    /// Small scatter prop.
    PropKind { Crate, Jar, Cart, Rug }
);

style_enum!(
    /// Horizon silhouette outline.
    SilhouetteShape { Tower, Block, Dome, Palm }
);

/// Number of material palettes available to buildings, shops and tents.
pub const PALETTE_COUNT: u8 = 6;

/// Style of an entity, one case per kind, each with its own parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum EntityStyle {
    /// District landmark (mosque).
    Landmark {
        /// Dome profile.
        dome: DomeShape,
        /// Number of minarets ringing the landmark.
        minarets: u8,
    },
    /// Free-standing minaret.
    Minaret {
        /// Number of balcony tiers.
        tiers: u8,
    },
    /// House or perimeter building.
    Building {
        /// Door style.
        door: DoorStyle,
        /// Material palette index.
        palette: u8,
        /// Number of storeys.
        storeys: u8,
    },
    /// Bazaar stall.
    Shop {
        /// Awning style.
        awning: AwningStyle,
        /// Goods on display.
        goods: Goods,
        /// Material palette index.
        palette: u8,
    },
    /// Single crop plant.
    Crop {
        /// Species.
        kind: CropKind,
    },
    /// Tree.
    Tree {
        /// Species.
        kind: TreeKind,
    },
    /// Fence post.
    FencePost,
    /// Nomadic camp tent.
    Tent {
        /// Material palette index.
        palette: u8,
    },
    /// Well or fountain.
    Well,
    /// Scatter prop.
    Prop {
        /// Prop kind.
        kind: PropKind,
    },
    /// Low-detail horizon silhouette.
    Silhouette {
        /// Outline.
        shape: SilhouetteShape,
    },
}

impl EntityStyle {
    /// The field-less category of this style.
    pub const fn category(&self) -> EntityCategory {
        match self {
            Self::Landmark { .. } => EntityCategory::Landmark,
            Self::Minaret { .. } => EntityCategory::Minaret,
            Self::Building { .. } => EntityCategory::Building,
            Self::Shop { .. } => EntityCategory::Shop,
            Self::Crop { .. } => EntityCategory::Crop,
            Self::Tree { .. } => EntityCategory::Tree,
            Self::FencePost => EntityCategory::FencePost,
            Self::Tent { .. } => EntityCategory::Tent,
            Self::Well => EntityCategory::Well,
            Self::Prop { .. } => EntityCategory::Prop,
            Self::Silhouette { .. } => EntityCategory::Silhouette,
        }
    }
}

/// Category tag of an entity, used for geometry lookup and LOD classing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityCategory {
    /// Mosque landmark.
    Landmark,
    /// Minaret.
    Minaret,
    /// House or perimeter building.
    Building,
    /// Bazaar stall.
    Shop,
    /// Crop plant.
    Crop,
    /// Tree.
    Tree,
    /// Fence post.
    FencePost,
    /// Tent.
    Tent,
    /// Well.
    Well,
    /// Scatter prop.
    Prop,
    /// Horizon silhouette.
    Silhouette,
}

impl EntityCategory {
    /// Every category.
    pub const ALL: [EntityCategory; 11] = [
        EntityCategory::Landmark,
        EntityCategory::Minaret,
        EntityCategory::Building,
        EntityCategory::Shop,
        EntityCategory::Crop,
        EntityCategory::Tree,
        EntityCategory::FencePost,
        EntityCategory::Tent,
        EntityCategory::Well,
        EntityCategory::Prop,
        EntityCategory::Silhouette,
    ];

    /// Number of pre-authored geometry variants for this category.
    pub const fn variant_count(self) -> u16 {
        match self {
            Self::Landmark | Self::Minaret | Self::Tent | Self::Well => 2,
            Self::Building => 6,
            Self::Shop | Self::Tree | Self::Silhouette => 4,
            Self::Crop | Self::Prop => 3,
            Self::FencePost => 1,
        }
    }
}

/// One placed object, prior to rendering.
///
/// Positions are tile-local in X and Z (relative to the tile centre) with an
/// absolute ground elevation in Y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EntityDescriptor {
    /// Style and style-specific parameters.
    pub style: EntityStyle,
    /// Tile-local position.
    pub position: Vec3,
    /// Yaw in radians.
    pub rotation: f32,
    /// Uniform scale.
    pub scale: f32,
    /// Geometry variant index, `< category().variant_count()`.
    pub variant: u16,
}

impl EntityDescriptor {
    /// Category tag.
    pub const fn category(&self) -> EntityCategory {
        self.style.category()
    }
}

/// Kind of auxiliary linear feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LinearKind {
    /// Irrigation canal.
    Canal,
    /// Footpath or lane.
    Path,
    /// Plough furrow inside a field.
    Furrow,
    /// Fence rail between posts.
    FenceLine,
    /// River.
    River,
}

/// A polyline with a width, in tile-local coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinearFeature {
    /// What the line represents.
    pub kind: LinearKind,
    /// Polyline vertices.
    pub points: Vec<Vec3>,
    /// Width in world units.
    pub width: f32,
}

/// Everything generated for one tile.
///
/// Built once per `(tile, session seed)` and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistrictLayout {
    tile: TileCoord,
    district: DistrictType,
    session_seed: u64,
    entities: Vec<EntityDescriptor>,
    features: Vec<LinearFeature>,
    rare_feature: Option<bool>,
}

impl DistrictLayout {
    pub(crate) fn new(
        tile: TileCoord,
        district: DistrictType,
        session_seed: u64,
        entities: Vec<EntityDescriptor>,
        features: Vec<LinearFeature>,
        rare_feature: Option<bool>,
    ) -> Self {
        Self {
            tile,
            district,
            session_seed,
            entities,
            features,
            rare_feature,
        }
    }

    /// A layout with no content.
    pub fn empty(tile: TileCoord, district: DistrictType, session_seed: u64) -> Self {
        Self::new(tile, district, session_seed, Vec::new(), Vec::new(), None)
    }

    /// The tile this layout belongs to.
    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    /// The district type it was generated as.
    pub fn district(&self) -> DistrictType {
        self.district
    }

    /// The session seed it was generated with.
    pub fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// All placed entities.
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// Canals, paths, furrows and fence lines.
    pub fn features(&self) -> &[LinearFeature] {
        &self.features
    }

    /// Result of the tile's single rare-feature draw, or `None` if this
    /// district has no rare feature.
    pub fn rare_feature(&self) -> Option<bool> {
        self.rare_feature
    }

    /// Whether the rare feature was rolled and is present.
    pub fn has_rare_feature(&self) -> bool {
        self.rare_feature == Some(true)
    }

    /// Whether the layout has neither entities nor features.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.features.is_empty()
    }

    /// Entities of one category.
    pub fn of_category(
        &self,
        category: EntityCategory,
    ) -> impl Iterator<Item = &EntityDescriptor> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.category() == category)
    }

    /// Number of entities of one category.
    pub fn count(&self, category: EntityCategory) -> usize {
        self.of_category(category).count()
    }

    /// Features of one kind.
    pub fn features_of(&self, kind: LinearKind) -> impl Iterator<Item = &LinearFeature> + '_ {
        self.features.iter().filter(move |f| f.kind == kind)
    }
}

//! Per-feature-class threshold bands.

use serde::{Deserialize, Serialize};

use crate::selector::{LodError, LodTier, TierThresholds, select, select_with_hysteresis};

/// Group of entities sharing one set of LOD thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureClass {
    /// Mosques and minarets.
    Landmark,
    /// Houses, shops, tents.
    Building,
    /// Trees and crops.
    Vegetation,
    /// Fence posts, wells and scatter props.
    Prop,
    /// Horizon silhouettes.
    Skyline,
}

impl FeatureClass {
    /// Every class.
    pub const ALL: [FeatureClass; 5] = [
        FeatureClass::Landmark,
        FeatureClass::Building,
        FeatureClass::Vegetation,
        FeatureClass::Prop,
        FeatureClass::Skyline,
    ];

    /// Default `[close, medium, far]` bands for this class.
    pub const fn default_bands(self) -> [f32; 3] {
        match self {
            Self::Landmark => [30.0, 80.0, 200.0],
            Self::Building => [20.0, 60.0, 150.0],
            Self::Vegetation => [15.0, 45.0, 120.0],
            Self::Prop => [10.0, 30.0, 70.0],
            Self::Skyline => [100.0, 300.0, 600.0],
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Thresholds for every [`FeatureClass`].
#[derive(Clone, Debug, PartialEq)]
pub struct LodProfile {
    bands: [TierThresholds; 5],
}

impl Default for LodProfile {
    fn default() -> Self {
        Self {
            bands: FeatureClass::ALL.map(|class| {
                let [close, medium, far] = class.default_bands();
                TierThresholds::new_unchecked(close, medium, far)
            }),
        }
    }
}

impl LodProfile {
    /// Build a profile from `[close, medium, far]` per class.
    pub fn from_bands(bands: impl Fn(FeatureClass) -> [f32; 3]) -> Result<Self, LodError> {
        let mut profile = Self::default();
        for class in FeatureClass::ALL {
            profile.set(class, TierThresholds::from_array(bands(class))?);
        }
        Ok(profile)
    }

    /// Thresholds for `class`.
    pub fn thresholds(&self, class: FeatureClass) -> &TierThresholds {
        &self.bands[class.index()]
    }

    /// Replace the thresholds for `class`.
    pub fn set(&mut self, class: FeatureClass, thresholds: TierThresholds) {
        self.bands[class.index()] = thresholds;
    }

    /// [`select`] with this class's thresholds.
    pub fn select(&self, class: FeatureClass, distance: Option<f32>) -> LodTier {
        select(distance, self.thresholds(class))
    }

    /// [`select_with_hysteresis`] with this class's thresholds.
    pub fn select_with_hysteresis(
        &self,
        class: FeatureClass,
        distance: Option<f32>,
        previous: Option<LodTier>,
        margin: f32,
    ) -> LodTier {
        select_with_hysteresis(distance, previous, self.thresholds(class), margin)
    }
}

//! Level-of-detail tiering: pure distance-based tier selection, per-class
//! threshold profiles, optional hysteresis and a movement gate for
//! throttling re-selection.

mod gate;
mod profile;
mod selector;

pub use gate::{DEFAULT_GATE_DISTANCE, MovementGate};
pub use profile::{FeatureClass, LodProfile};
pub use selector::{
    LodError, LodTier, TierThresholds, select, select_with_hysteresis, viewer_distance,
};

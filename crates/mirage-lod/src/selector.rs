//! Distance-based tier selection with explicit thresholds and optional hysteresis.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete detail tier, ordered from most to least detailed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LodTier {
    /// Full detail.
    Close,
    /// Reduced detail.
    Medium,
    /// Impostor-quality detail.
    Far,
    /// Flat silhouette, the coarsest tier.
    Silhouette,
}

impl LodTier {
    /// Every tier, finest first.
    pub const ALL: [LodTier; 4] = [
        LodTier::Close,
        LodTier::Medium,
        LodTier::Far,
        LodTier::Silhouette,
    ];

    /// The coarsest tier, used when the viewer distance is unknown.
    pub const COARSEST: LodTier = LodTier::Silhouette;

    /// Index of this tier in [`LodTier::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Errors returned when building [`TierThresholds`].
#[derive(Debug, Error, PartialEq)]
pub enum LodError {
    /// A threshold was NaN or infinite.
    #[error("LOD threshold {index} is not finite")]
    NonFinite {
        /// Position of the offending threshold.
        index: usize,
    },
    /// A threshold was zero or negative.
    #[error("LOD threshold {index} must be positive, got {value}")]
    NonPositive {
        /// Position of the offending threshold.
        index: usize,
        /// The rejected value.
        value: f32,
    },
    /// Thresholds were not strictly increasing.
    #[error("LOD thresholds must be strictly increasing, got {lower} then {upper}")]
    NotIncreasing {
        /// The earlier threshold.
        lower: f32,
        /// The later, not larger, threshold.
        upper: f32,
    },
}

/// Upper distance bounds of the `Close`, `Medium` and `Far` tiers.
///
/// A distance strictly below `close` is [`LodTier::Close`]; a distance equal
/// to a threshold resolves to the coarser tier. Anything at or beyond `far`
/// is [`LodTier::Silhouette`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TierThresholds {
    close: f32,
    medium: f32,
    far: f32,
}

impl TierThresholds {
    /// Validate and build thresholds.
    pub fn new(close: f32, medium: f32, far: f32) -> Result<Self, LodError> {
        let bands = [close, medium, far];
        for (index, &value) in bands.iter().enumerate() {
            if !value.is_finite() {
                return Err(LodError::NonFinite { index });
            }
            if value <= 0.0 {
                return Err(LodError::NonPositive { index, value });
            }
        }
        for pair in bands.windows(2) {
            if pair[1] <= pair[0] {
                return Err(LodError::NotIncreasing {
                    lower: pair[0],
                    upper: pair[1],
                });
            }
        }
        Ok(Self { close, medium, far })
    }

    /// Built-in bands that are known to be valid.
    pub(crate) const fn new_unchecked(close: f32, medium: f32, far: f32) -> Self {
        Self { close, medium, far }
    }

    /// Build from `[close, medium, far]`.
    pub fn from_array(bands: [f32; 3]) -> Result<Self, LodError> {
        Self::new(bands[0], bands[1], bands[2])
    }

    /// Upper bound of [`LodTier::Close`].
    pub fn close(&self) -> f32 {
        self.close
    }

    /// Upper bound of [`LodTier::Medium`].
    pub fn medium(&self) -> f32 {
        self.medium
    }

    /// Upper bound of [`LodTier::Far`].
    pub fn far(&self) -> f32 {
        self.far
    }

    /// `[close, medium, far]`.
    pub fn to_array(&self) -> [f32; 3] {
        [self.close, self.medium, self.far]
    }
}

/// Select the tier for a viewer distance.
///
/// Pure: the result depends only on the arguments. `None`, NaN and infinite
/// distances select [`LodTier::COARSEST`]. Negative distances are treated as
/// zero.
pub fn select(distance: Option<f32>, thresholds: &TierThresholds) -> LodTier {
    let Some(d) = distance.filter(|d| !d.is_nan()) else {
        return LodTier::COARSEST;
    };
    let d = d.max(0.0);
    if d < thresholds.close {
        LodTier::Close
    } else if d < thresholds.medium {
        LodTier::Medium
    } else if d < thresholds.far {
        LodTier::Far
    } else {
        LodTier::Silhouette
    }
}

/// Tier selection that resists flicker near a threshold.
///
/// A tier change away from `previous` only happens once the distance is at
/// least `margin` past the crossed threshold. With no previous tier, an
/// unknown distance or a zero margin this equals [`select`]. Still pure: the
/// caller owns and passes the previous tier.
pub fn select_with_hysteresis(
    distance: Option<f32>,
    previous: Option<LodTier>,
    thresholds: &TierThresholds,
    margin: f32,
) -> LodTier {
    let raw = select(distance, thresholds);
    let (Some(previous), Some(d)) = (previous, distance.filter(|d| d.is_finite())) else {
        return raw;
    };
    let margin = if margin.is_finite() { margin.max(0.0) } else { 0.0 };

    if raw > previous {
        previous.max(select(Some(d - margin), thresholds))
    } else if raw < previous {
        previous.min(select(Some(d + margin), thresholds))
    } else {
        raw
    }
}

/// Distance from the viewer to `target`, or `None` if the viewer position is
/// unknown or not finite.
pub fn viewer_distance(viewer: Option<Vec3>, target: Vec3) -> Option<f32> {
    viewer
        .filter(|v| v.is_finite())
        .map(|v| v.distance(target))
        .filter(|d| d.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark() -> TierThresholds {
        TierThresholds::new(30.0, 80.0, 200.0).unwrap()
    }

    /// A viewer standing on the entity gets full detail.
    #[test]
    fn test_zero_distance_is_close() {
        assert_eq!(select(Some(0.0), &landmark()), LodTier::Close);
    }

    /// A distance exactly at a threshold resolves to the coarser side.
    #[test]
    fn test_threshold_boundary_behavior() {
        let t = landmark();
        assert_eq!(select(Some(29.999), &t), LodTier::Close);
        assert_eq!(select(Some(30.0), &t), LodTier::Medium);
        assert_eq!(select(Some(79.999), &t), LodTier::Medium);
        assert_eq!(select(Some(80.0), &t), LodTier::Far);
        assert_eq!(select(Some(199.999), &t), LodTier::Far);
        assert_eq!(select(Some(200.0), &t), LodTier::Silhouette);
    }

    /// Tier never gets finer as distance grows, and never skips a tier.
    #[test]
    fn test_monotonic_without_skipping() {
        let t = landmark();
        let mut prev = LodTier::Close;
        let mut d = 0.0;
        while d < 400.0 {
            let tier = select(Some(d), &t);
            assert!(tier >= prev, "tier got finer at d={d}: {tier:?} after {prev:?}");
            assert!(
                tier.index() <= prev.index() + 1,
                "tier skipped from {prev:?} to {tier:?} at d={d}"
            );
            prev = tier;
            d += 0.25;
        }
        assert_eq!(prev, LodTier::Silhouette);
    }

    /// Unknown or nonsense distances fall back to the coarsest tier.
    #[test]
    fn test_unknown_distance_is_coarsest() {
        let t = landmark();
        assert_eq!(select(None, &t), LodTier::Silhouette);
        assert_eq!(select(Some(f32::NAN), &t), LodTier::Silhouette);
        assert_eq!(select(Some(f32::INFINITY), &t), LodTier::Silhouette);
        assert_eq!(select(Some(-5.0), &t), LodTier::Close);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert_eq!(
            TierThresholds::new(30.0, 30.0, 200.0),
            Err(LodError::NotIncreasing {
                lower: 30.0,
                upper: 30.0
            })
        );
        assert_eq!(
            TierThresholds::new(0.0, 30.0, 200.0),
            Err(LodError::NonPositive {
                index: 0,
                value: 0.0
            })
        );
        assert_eq!(
            TierThresholds::new(10.0, f32::NAN, 200.0),
            Err(LodError::NonFinite { index: 1 })
        );
        assert!(TierThresholds::from_array([10.0, 20.0, 5.0]).is_err());
    }

    /// Oscillating around a threshold does not flip the tier inside the margin.
    #[test]
    fn test_hysteresis_holds_tier_inside_margin() {
        let t = landmark();
        let mut tier = select(Some(29.0), &t);
        assert_eq!(tier, LodTier::Close);
        for d in [30.5, 29.5, 31.9, 28.2, 30.0] {
            tier = select_with_hysteresis(Some(d), Some(tier), &t, 2.0);
            assert_eq!(tier, LodTier::Close, "flipped at d={d}");
        }
        tier = select_with_hysteresis(Some(32.0), Some(tier), &t, 2.0);
        assert_eq!(tier, LodTier::Medium);
        // Coming back needs to get 2 units inside the threshold.
        tier = select_with_hysteresis(Some(28.5), Some(tier), &t, 2.0);
        assert_eq!(tier, LodTier::Medium);
        tier = select_with_hysteresis(Some(27.9), Some(tier), &t, 2.0);
        assert_eq!(tier, LodTier::Close);
    }

    /// Large jumps still land on the right tier.
    #[test]
    fn test_hysteresis_large_jump() {
        let t = landmark();
        assert_eq!(
            select_with_hysteresis(Some(500.0), Some(LodTier::Close), &t, 5.0),
            LodTier::Silhouette
        );
        assert_eq!(
            select_with_hysteresis(Some(1.0), Some(LodTier::Silhouette), &t, 5.0),
            LodTier::Close
        );
    }

    #[test]
    fn test_hysteresis_degenerates_to_select() {
        let t = landmark();
        for d in [0.0, 29.0, 30.0, 81.0, 250.0] {
            assert_eq!(select_with_hysteresis(Some(d), None, &t, 3.0), select(Some(d), &t));
            for prev in LodTier::ALL {
                assert_eq!(
                    select_with_hysteresis(Some(d), Some(prev), &t, 0.0),
                    select(Some(d), &t)
                );
            }
        }
        assert_eq!(
            select_with_hysteresis(None, Some(LodTier::Close), &t, 3.0),
            LodTier::Silhouette
        );
    }

    #[test]
    fn test_viewer_distance() {
        let d = viewer_distance(Some(Vec3::new(3.0, 0.0, 4.0)), Vec3::ZERO);
        assert_eq!(d, Some(5.0));
        assert_eq!(viewer_distance(None, Vec3::ZERO), None);
        assert_eq!(viewer_distance(Some(Vec3::NAN), Vec3::ZERO), None);
    }
}

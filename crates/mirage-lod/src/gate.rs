//! Throttling of LOD re-selection to significant viewer movement.

use glam::Vec3;
use tracing::warn;

/// Default distance the viewer must travel before tiers are re-selected.
pub const DEFAULT_GATE_DISTANCE: f32 = 2.0;

/// Opens when the viewer has moved at least `min_distance` since it last
/// opened.
///
/// This is the only LOD type with memory; the selector itself stays pure.
#[derive(Clone, Debug)]
pub struct MovementGate {
    min_distance: f32,
    last: Option<Vec3>,
}

impl Default for MovementGate {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_DISTANCE)
    }
}

impl MovementGate {
    /// A gate that opens after `min_distance` of travel. Negative or
    /// non-finite distances open on every call.
    pub fn new(min_distance: f32) -> Self {
        let sanitized = if min_distance.is_finite() {
            min_distance.max(0.0)
        } else {
            0.0
        };
        if sanitized != min_distance {
            warn!(min_distance, sanitized, "invalid movement gate distance");
        }
        let min_distance = sanitized;
        Self {
            min_distance,
            last: None,
        }
    }

    /// Whether tiers should be re-selected for a viewer at `viewer`. The
    /// first finite position always opens the gate. Non-finite positions
    /// never do.
    pub fn should_update(&mut self, viewer: Vec3) -> bool {
        if !viewer.is_finite() {
            return false;
        }
        let open = match self.last {
            None => true,
            Some(last) => last.distance_squared(viewer) >= self.min_distance * self.min_distance,
        };
        if open {
            self.last = Some(viewer);
        }
        open
    }

    /// Forget the last position so the next call opens the gate.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Position at which the gate last opened.
    pub fn last_position(&self) -> Option<Vec3> {
        self.last
    }

    /// Travel distance required to open the gate.
    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }
}

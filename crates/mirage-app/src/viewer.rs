//! Scripted viewer motion for the headless driver.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

/// Eye height above the ground plane.
pub const EYE_HEIGHT: f32 = 1.7;

/// A viewer walking east at constant speed, weaving gently north and south.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerPath {
    start: Vec2,
    speed: f32,
    weave_amplitude: f32,
    weave_period: f32,
}

impl ViewerPath {
    /// A path from `start` (world XZ) at `speed` units per second. Negative
    /// or non-finite speeds stand still.
    pub fn new(start: Vec2, speed: f32) -> Self {
        let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        Self {
            start,
            speed,
            weave_amplitude: 12.0,
            weave_period: 20.0,
        }
    }

    /// Viewer position `t` seconds after the start.
    pub fn position(&self, t: f64) -> Vec3 {
        let t = t as f32;
        let x = self.start.x + self.speed * t;
        let z = self.start.y + self.weave_amplitude * (TAU * t / self.weave_period).sin();
        Vec3::new(x, EYE_HEIGHT, z)
    }

    /// Walking speed in world units per second.
    pub fn speed(&self) -> f32 {
        self.speed
    }
}

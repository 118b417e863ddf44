//! Per-instance GPU data.

use glam::{Mat4, Quat, Vec3};
use mirage_procgen::EntityDescriptor;

/// Per-instance transform, laid out for direct upload into an instance buffer.
///
/// Layout (32 bytes total):
///   - `[0..12]`  position `[f32; 3]`, world space
///   - `[12..16]` rotation `f32`, yaw in radians
///   - `[16..20]` scale `f32`, uniform
///   - `[20..32]` padding
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    /// World-space position.
    pub position: [f32; 3],
    /// Yaw around +Y in radians.
    pub rotation: f32,
    /// Uniform scale.
    pub scale: f32,
    /// Reserved, aligns the struct to 32 bytes.
    pub _pad: [f32; 3],
}

static_assertions::assert_eq_size!(InstanceTransform, [u8; 32]);

impl InstanceTransform {
    /// Build a transform from its parts.
    pub fn new(position: Vec3, rotation: f32, scale: f32) -> Self {
        Self {
            position: position.to_array(),
            rotation,
            scale,
            _pad: [0.0; 3],
        }
    }

    /// Transform of a tile-local descriptor whose tile centre is `origin`.
    pub fn from_descriptor(entity: &EntityDescriptor, origin: Vec3) -> Self {
        Self::new(origin + entity.position, entity.rotation, entity.scale)
    }

    /// World-space position.
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Model matrix: scale, then yaw, then translate.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation),
            self.position(),
        )
    }
}

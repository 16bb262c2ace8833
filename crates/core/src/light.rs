//! Scene lights and the light-vector convention shared with the lighting shaders.
//!
//! A light is packed into a `vec4` for the shaders: `w == 0` means `xyz` is a
//! direction towards the light, `w == 1` means `xyz` is a world-space position.

use crate::{Vec3, Vec4};

/// Constant, linear and quadratic attenuation coefficients used by positional lights.
pub const ATTENUATION: [f32; 3] = [0.01, 0.01, 0.01];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Direction pointing towards the light.
    Directional(Vec3),
    /// World-space position.
    Point(Vec3),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Directional(direction),
            color,
        }
    }

    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            kind: LightKind::Point(position),
            color,
        }
    }

    /// Value bound to the world light position uniform.
    pub fn world_light_pos(&self) -> Vec4 {
        match self.kind {
            LightKind::Directional(dir) => dir.extend(0.0),
            LightKind::Point(pos) => pos.extend(1.0),
        }
    }

    /// Normalized direction from `world_pos` towards the light.
    pub fn light_dir(&self, world_pos: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Directional(dir) => dir.normalize(),
            LightKind::Point(pos) => (pos - world_pos).normalize(),
        }
    }

    /// Attenuation factor at `world_pos`; always 1 for directional lights.
    pub fn attenuation(&self, world_pos: Vec3) -> f32 {
        match self.kind {
            LightKind::Directional(_) => 1.0,
            LightKind::Point(pos) => {
                let d = (pos - world_pos).length();
                let [a0, a1, a2] = ATTENUATION;
                1.0 / (a0 + a1 * d + a2 * d * d)
            }
        }
    }
}

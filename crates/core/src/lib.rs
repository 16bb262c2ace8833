//! Core types shared by the asset and renderer crates: math re-exports, camera and lights.

pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4, vec3, vec4};

pub mod camera;
pub mod light;

pub use camera::CameraState;
pub use light::{Light, LightKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_view_proj_is_finite() {
        let cam = CameraState::look_at(
            vec3(0.0, 0.0, 8.0),
            Vec3::ZERO,
            Vec3::Y,
            75f32.to_radians(),
            0.75,
            0.1,
            100.0,
        );
        let a = cam.view_proj().to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
        assert_eq!(cam.world_position(), vec3(0.0, 0.0, 8.0));
    }

    #[test]
    fn directional_light_packs_w_zero() {
        let light = Light::directional(vec3(0.0, 1.0, 0.0), Vec3::ONE);
        assert_eq!(light.world_light_pos(), vec4(0.0, 1.0, 0.0, 0.0));
    }
}

use crate::{Mat4, Vec3};

/// Camera values consumed by the renderer: where the eye is and how the world
/// is projected. Projection itself comes from glam.
#[derive(Clone, Copy, Debug)]
pub struct CameraState {
    eye: Vec3,
    view: Mat4,
    proj: Mat4,
}

impl CameraState {
    pub fn new(eye: Vec3, view: Mat4, proj: Mat4) -> Self {
        Self { eye, view, proj }
    }

    /// Right-handed look-at camera with an OpenGL-style perspective projection.
    #[allow(clippy::too_many_arguments)]
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        aspect: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            eye,
            view: Mat4::look_at_rh(eye, target, up),
            proj: Mat4::perspective_rh_gl(fov_y_rad, aspect.max(1e-6), z_near, z_far),
        }
    }

    #[inline]
    pub fn world_position(&self) -> Vec3 {
        self.eye
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

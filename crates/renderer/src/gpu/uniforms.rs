use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use lensing::{CameraUniform, FramePlan};

/// Star sprite opacity written to `ObjectUniforms::params.x`.
pub(crate) const STAR_OPACITY: f32 = 0.8;
/// Star sprite edge length in pixels, `ObjectUniforms::params.y`.
pub(crate) const STAR_SIZE_PX: f32 = 1.5;

/// Group 0 of every scene-pass program (`FrameParams` in GLSL).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// `(width, height, seconds, 0)`.
    pub viewport: [f32; 4],
}

impl FrameUniforms {
    pub fn from_plan(plan: &FramePlan) -> Self {
        let CameraUniform {
            view_proj,
            inv_view_proj,
            position,
        } = plan.camera;
        let [width, height] = plan.resolution();
        Self {
            view_proj,
            inv_view_proj,
            camera_position: position,
            viewport: [width, height, plan.time, 0.0],
        }
    }
}

/// Group 1: per-object model matrix plus two free parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub params: [f32; 4],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, params: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            params,
        }
    }

    pub fn stars(model: Mat4) -> Self {
        Self::new(model, [STAR_OPACITY, STAR_SIZE_PX, 0.0, 0.0])
    }
}

/// Distortion pass parameters (`LensParams` in GLSL).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct LensUniforms {
    pub resolution: [f32; 2],
    pub mass: f32,
    pub padding: f32,
}

impl LensUniforms {
    pub fn new(resolution: [f32; 2], mass: f32) -> Self {
        Self {
            resolution,
            mass,
            padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensing::{OrbitCamera, ViewportSize};

    #[test]
    fn uniform_sizes_match_std140_blocks() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 80);
        assert_eq!(std::mem::size_of::<LensUniforms>(), 16);
    }

    #[test]
    fn frame_uniforms_pack_viewport_and_time() {
        let camera = OrbitCamera::new(800.0 / 600.0);
        let plan = FramePlan {
            viewport: ViewportSize::new(800, 600),
            resized: false,
            mass: 50.0,
            show_disk: true,
            time: 2.5,
            camera: camera.uniform(),
            disk_model: Mat4::IDENTITY,
            star_model: Mat4::IDENTITY,
        };
        let uniforms = FrameUniforms::from_plan(&plan);
        assert_eq!(uniforms.viewport, [800.0, 600.0, 2.5, 0.0]);
        assert_eq!(uniforms.camera_position, camera.uniform().position);
    }

    #[test]
    fn star_uniforms_carry_opacity_and_size() {
        let uniforms = ObjectUniforms::stars(Mat4::IDENTITY);
        assert_eq!(uniforms.params[0], STAR_OPACITY);
        assert_eq!(uniforms.params[1], STAR_SIZE_PX);
        assert_eq!(uniforms.model, Mat4::IDENTITY.to_cols_array_2d());
    }
}

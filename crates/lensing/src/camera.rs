//! Damped orbit camera circling the origin.
//!
//! Input adds to a pending spherical velocity; every [`OrbitCamera::update`]
//! applies a fraction of it (the damping factor) and decays the rest, so the
//! view keeps gliding briefly after the pointer stops.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Canonical distance from the origin after a reset.
pub const HOME_DISTANCE: f32 = 30.0;
pub const DAMPING_FACTOR: f32 = 0.05;
pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 100.0;

const POLAR_EPSILON: f32 = 1e-4;
const ZOOM_STEP: f32 = 0.95;
/// Velocities below this are treated as settled.
const REST_THRESHOLD: f32 = 1e-6;

/// View-projection data consumed by the scene pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    target: Vec3,
    distance: f32,
    /// Azimuth around +Y, zero looking down -Z.
    theta: f32,
    /// Polar angle measured from +Y.
    phi: f32,
    /// Pending (theta, phi) rotation.
    velocity: Vec2,
    zoom: f32,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: HOME_DISTANCE,
            theta: 0.0,
            phi: FRAC_PI_2,
            velocity: Vec2::ZERO,
            zoom: 1.0,
            fov_y: 75.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Restores the canonical pose at (0, 0, 30) and clears pending motion.
    pub fn reset(&mut self) {
        self.target = Vec3::ZERO;
        self.distance = HOME_DISTANCE;
        self.theta = 0.0;
        self.phi = FRAC_PI_2;
        self.velocity = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Queues rotation from a pointer drag of `delta` pixels.
    pub fn orbit(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.velocity.x -= TAU * delta.x / height;
        self.velocity.y -= TAU * delta.y / height;
    }

    /// Queues a zoom; positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.zoom *= ZOOM_STEP.powf(steps);
    }

    /// Integrates one frame of damped motion.
    pub fn update(&mut self) {
        self.theta = (self.theta + self.velocity.x * DAMPING_FACTOR).rem_euclid(TAU);
        self.phi = (self.phi + self.velocity.y * DAMPING_FACTOR)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.distance = (self.distance * self.zoom).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.zoom = 1.0;

        self.velocity *= 1.0 - DAMPING_FACTOR;
        if self.velocity.length() < REST_THRESHOLD {
            self.velocity = Vec2::ZERO;
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Pending rotation still to be applied by future updates.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + Vec3::new(
                self.distance * sin_phi * self.theta.sin(),
                self.distance * self.phi.cos(),
                self.distance * sin_phi * self.theta.cos(),
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn uniform(&self) -> CameraUniform {
        let view_proj = self.view_projection();
        CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            position: self.position().extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn starts_at_home_pose() {
        let camera = OrbitCamera::new(4.0 / 3.0);
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 30.0)));
    }

    #[test]
    fn drag_keeps_moving_after_release() {
        let mut camera = OrbitCamera::new(1.0);
        camera.orbit(Vec2::new(120.0, 0.0), 600.0);
        camera.update();
        let first = camera.position();
        camera.update();
        let second = camera.position();
        assert!(!approx(first, second));
        assert!(camera.velocity().length() > 0.0);
    }

    #[test]
    fn velocity_decays_to_rest() {
        let mut camera = OrbitCamera::new(1.0);
        camera.orbit(Vec2::new(50.0, 30.0), 600.0);
        for _ in 0..2000 {
            camera.update();
        }
        assert_eq!(camera.velocity(), Vec2::ZERO);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::new(1.0);
        camera.zoom(500.0);
        camera.update();
        assert_eq!(camera.distance(), MIN_DISTANCE);
        camera.zoom(-500.0);
        camera.update();
        assert_eq!(camera.distance(), MAX_DISTANCE);
    }

    #[test]
    fn polar_angle_never_flips() {
        let mut camera = OrbitCamera::new(1.0);
        camera.orbit(Vec2::new(0.0, -50_000.0), 600.0);
        for _ in 0..200 {
            camera.update();
            assert!(camera.position().y <= camera.distance());
            assert!(camera.position().is_finite());
        }
    }

    #[test]
    fn reset_restores_home_and_clears_velocity() {
        let mut camera = OrbitCamera::new(16.0 / 9.0);
        camera.orbit(Vec2::new(300.0, -140.0), 720.0);
        camera.zoom(6.0);
        for _ in 0..10 {
            camera.update();
        }
        camera.orbit(Vec2::new(-80.0, 10.0), 720.0);
        camera.zoom(-2.0);

        camera.reset();
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 30.0)));
        assert_eq!(camera.velocity(), Vec2::ZERO);

        // Nothing pending survives the reset.
        camera.update();
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 30.0)));
    }

    #[test]
    fn uniform_inverse_round_trips() {
        let camera = OrbitCamera::new(1.5);
        let uniform = camera.uniform();
        let view_proj = Mat4::from_cols_array_2d(&uniform.view_proj);
        let inverse = Mat4::from_cols_array_2d(&uniform.inv_view_proj);
        let identity = view_proj * inverse;
        assert!(identity.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn uniform_layout_is_std140_sized() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }
}

//! Per-frame state machine shared by the GPU pipeline and headless callers.

use std::time::{Duration, Instant};

use glam::Mat4;

use crate::camera::{CameraUniform, OrbitCamera};
use crate::clock::FrameClock;
use crate::params::{SimulationParameters, ViewportSize};
use crate::scene::SceneGraph;

/// Everything the GPU needs to draw one frame, resolved on the CPU.
#[derive(Debug, Clone, Copy)]
pub struct FramePlan {
    pub viewport: ViewportSize,
    /// Set when the viewport differs from the previous drawn frame, so the
    /// offscreen target must be rebuilt before drawing.
    pub resized: bool,
    /// Guarded mass fed to the distortion pass.
    pub mass: f32,
    pub show_disk: bool,
    /// Seconds since the pipeline started.
    pub time: f32,
    pub camera: CameraUniform,
    pub disk_model: Mat4,
    pub star_model: Mat4,
}

impl FramePlan {
    pub fn resolution(&self) -> [f32; 2] {
        [self.viewport.width as f32, self.viewport.height as f32]
    }
}

/// Mutable pipeline state that lives for one start/stop cycle.
#[derive(Debug, Clone)]
pub struct PipelineState {
    scene: SceneGraph,
    camera: OrbitCamera,
    clock: FrameClock,
    viewport: Option<ViewportSize>,
}

impl PipelineState {
    pub fn new(scene: SceneGraph, viewport: ViewportSize) -> Self {
        Self {
            scene,
            camera: OrbitCamera::new(viewport.aspect()),
            clock: FrameClock::new(),
            viewport: None,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Last viewport a frame was planned for.
    pub fn viewport(&self) -> Option<ViewportSize> {
        self.viewport
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }

    /// Plans the next frame after an explicit time step.
    ///
    /// Time always advances. A zero-area viewport yields `None` and leaves the
    /// scene, camera and recorded viewport untouched, so the next non-empty
    /// frame is planned as a resize if the size changed in between.
    pub fn begin_frame(
        &mut self,
        params: SimulationParameters,
        viewport: ViewportSize,
        delta: Duration,
    ) -> Option<FramePlan> {
        self.clock.advance(delta);
        self.plan(params, viewport)
    }

    /// Plans the next frame at wall-clock time `now`. The first call only
    /// anchors the clock.
    pub fn begin_frame_at(
        &mut self,
        params: SimulationParameters,
        viewport: ViewportSize,
        now: Instant,
    ) -> Option<FramePlan> {
        self.clock.tick(now);
        self.plan(params, viewport)
    }

    fn plan(&mut self, params: SimulationParameters, viewport: ViewportSize) -> Option<FramePlan> {
        if viewport.is_empty() {
            return None;
        }

        let resized = self.viewport != Some(viewport);
        if resized {
            self.camera.set_aspect(viewport.aspect());
            self.viewport = Some(viewport);
        }

        self.scene.advance();
        self.camera.update();

        Some(FramePlan {
            viewport,
            resized,
            mass: params.effective_mass(),
            show_disk: params.show_disk,
            time: self.clock.seconds(),
            camera: self.camera.uniform(),
            disk_model: self.scene.disk_model(),
            star_model: self.scene.star_model(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DiskStyle;
    use crate::params::MIN_MASS;
    use crate::scene::{SceneBuilder, SceneSettings};

    const STEP: Duration = Duration::from_millis(16);

    fn state() -> PipelineState {
        let scene = SceneBuilder::new(
            SceneSettings {
                star_samples: 64,
                star_seed: Some(9),
                ..SceneSettings::default()
            },
            DiskStyle::default(),
        )
        .build();
        PipelineState::new(scene, ViewportSize::new(800, 600))
    }

    #[test]
    fn first_frame_sizes_targets() {
        let mut state = state();
        let plan = state
            .begin_frame(SimulationParameters::default(), ViewportSize::new(800, 600), STEP)
            .expect("frame");
        assert!(plan.resized);
        assert_eq!(plan.resolution(), [800.0, 600.0]);
        assert_eq!(plan.mass, 50.0);

        let plan = state
            .begin_frame(SimulationParameters::default(), ViewportSize::new(800, 600), STEP)
            .expect("frame");
        assert!(!plan.resized);
    }

    #[test]
    fn hiding_the_disk_applies_on_next_frame() {
        let mut state = state();
        let viewport = ViewportSize::new(640, 480);
        let shown = state
            .begin_frame(SimulationParameters::new(50.0, true), viewport, STEP)
            .expect("frame");
        assert!(shown.show_disk);
        let hidden = state
            .begin_frame(SimulationParameters::new(50.0, false), viewport, STEP)
            .expect("frame");
        assert!(!hidden.show_disk);
    }

    #[test]
    fn resize_updates_resolution_and_aspect() {
        let mut state = state();
        let params = SimulationParameters::default();
        state.begin_frame(params, ViewportSize::new(800, 600), STEP);
        let plan = state
            .begin_frame(params, ViewportSize::new(1920, 1080), STEP)
            .expect("frame");
        assert!(plan.resized);
        assert_eq!(plan.resolution(), [1920.0, 1080.0]);
        assert!((state.camera().aspect() - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn zero_viewport_is_skipped_without_losing_time() {
        let mut state = state();
        let params = SimulationParameters::default();
        state.begin_frame(params, ViewportSize::new(800, 600), STEP);
        let rotation = state.scene().disk_rotation();

        assert!(state
            .begin_frame(params, ViewportSize::new(0, 600), STEP)
            .is_none());
        assert!(state
            .begin_frame(params, ViewportSize::new(800, 0), STEP)
            .is_none());
        assert_eq!(state.scene().disk_rotation(), rotation);
        assert_eq!(state.viewport(), Some(ViewportSize::new(800, 600)));
        assert_eq!(state.clock().elapsed(), STEP * 3);

        let plan = state
            .begin_frame(params, ViewportSize::new(800, 600), STEP)
            .expect("frame");
        assert!(!plan.resized);
        assert!((plan.time - (STEP * 4).as_secs_f32()).abs() < 1e-6);
    }

    #[test]
    fn wall_clock_frames_advance_by_tick_delta() {
        let mut state = state();
        let params = SimulationParameters::default();
        let viewport = ViewportSize::new(800, 600);
        let start = Instant::now();

        let first = state.begin_frame_at(params, viewport, start).expect("frame");
        assert_eq!(first.time, 0.0);
        assert!(state
            .begin_frame_at(params, ViewportSize::new(0, 0), start + STEP)
            .is_none());
        let plan = state
            .begin_frame_at(params, viewport, start + STEP * 3)
            .expect("frame");
        assert!(!plan.resized);
        assert_eq!(state.clock().elapsed(), STEP * 3);
        assert!((plan.time - (STEP * 3).as_secs_f32()).abs() < 1e-6);
    }

    #[test]
    fn guarded_mass_reaches_the_plan() {
        let mut state = state();
        let plan = state
            .begin_frame(
                SimulationParameters::new(0.0, true),
                ViewportSize::new(320, 240),
                STEP,
            )
            .expect("frame");
        assert_eq!(plan.mass, MIN_MASS);
    }

    #[test]
    fn reset_camera_returns_home_on_next_frame() {
        let mut state = state();
        let params = SimulationParameters::default();
        let viewport = ViewportSize::new(800, 600);
        state.camera_mut().orbit(glam::Vec2::new(200.0, 80.0), 600.0);
        for _ in 0..5 {
            state.begin_frame(params, viewport, STEP);
        }
        state.reset_camera();
        let plan = state.begin_frame(params, viewport, STEP).expect("frame");
        let position = glam::Vec3::from_slice(&plan.camera.position[..3]);
        assert!((position - glam::Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
    }
}

use std::time::Duration;

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use lensing::distortion::VOID;
use lensing::{
    composite, DiskStyle, Lens, LensSample, PipelineState, SceneBuilder, SceneSettings,
    SimulationParameters, ViewportSize,
};

const STEP: Duration = Duration::from_millis(16);

fn checkerboard(width: u32, height: u32, block: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / block + y / block) % 2 == 0 {
            Rgba([240, 230, 200, 255])
        } else {
            Rgba([20, 40, 90, 255])
        }
    })
}

fn pipeline() -> PipelineState {
    let scene = SceneBuilder::new(
        SceneSettings {
            star_samples: 500,
            star_seed: Some(2024),
            ..SceneSettings::default()
        },
        DiskStyle::default(),
    )
    .build();
    PipelineState::new(scene, ViewportSize::new(800, 600))
}

#[test]
fn heavy_mass_blackens_the_horizon() {
    let source = checkerboard(800, 600, 8);
    let output = composite(&source, 50.0);
    let lens = Lens::new(50.0, ViewportSize::new(800, 600));
    let radius = lens.schwarzschild_radius();

    // Horizon radius in pixels along the vertical axis (no aspect stretch).
    let radius_px = radius * 0.5 * 600.0;
    for offset in [0.0_f32, 0.25, 0.5, 0.9] {
        let dy = (radius_px * offset) as u32;
        assert_eq!(*output.get_pixel(400, 300 + dy), Rgba(VOID), "offset {offset}");
        assert_eq!(*output.get_pixel(400, 300 - dy), Rgba(VOID), "offset {offset}");
    }

    // Well outside the horizon the background comes through.
    assert_ne!(*output.get_pixel(400, 20), Rgba(VOID));
}

#[test]
fn light_mass_leaves_corners_untouched() {
    let source = checkerboard(800, 600, 8);
    let output = composite(&source, 1.0);
    for (x, y) in [(0, 0), (799, 0), (0, 599), (799, 599), (4, 4)] {
        assert_eq!(output.get_pixel(x, y), source.get_pixel(x, y), "pixel ({x}, {y})");
    }
}

#[test]
fn lens_sampling_is_per_pixel() {
    // Changing one source pixel far from another output pixel's sample must
    // not affect that output pixel.
    let mut source = checkerboard(64, 64, 4);
    let before = composite(&source, 20.0);
    source.put_pixel(0, 0, Rgba([255, 0, 255, 255]));
    let after = composite(&source, 20.0);
    for (x, y, pixel) in after.enumerate_pixels() {
        if x > 4 || y > 4 {
            assert_eq!(pixel, before.get_pixel(x, y));
        }
    }
}

#[test]
fn escaped_samples_are_black() {
    let lens = Lens::new(50.0, ViewportSize::new(800, 600));
    assert!(matches!(lens.sample(Vec2::new(0.01, 0.99)), LensSample::Texel(_)));
    // Pulled inward but still past the right edge.
    assert_eq!(lens.sample(Vec2::new(1.6, 0.5)), LensSample::Escaped);
}

#[test]
fn disk_toggle_has_no_lag() {
    let mut state = pipeline();
    let viewport = ViewportSize::new(800, 600);
    let mut params = SimulationParameters::default();

    let frames: Vec<bool> = (0..6)
        .map(|frame| {
            if frame == 3 {
                params = params.with_disk_toggled();
            }
            state
                .begin_frame(params, viewport, STEP)
                .map(|plan| plan.show_disk)
                .unwrap_or_default()
        })
        .collect();
    assert_eq!(frames, vec![true, true, true, false, false, false]);
}

#[test]
fn reset_camera_after_interaction() {
    let mut state = pipeline();
    let viewport = ViewportSize::new(800, 600);
    let params = SimulationParameters::default();

    for step in 0..20 {
        let camera = state.camera_mut();
        camera.orbit(Vec2::new(15.0 * step as f32, -7.0), 600.0);
        camera.zoom(if step % 2 == 0 { 3.0 } else { -1.0 });
        state.begin_frame(params, viewport, STEP);
    }
    assert!((state.camera().position() - Vec3::new(0.0, 0.0, 30.0)).length() > 1.0);

    state.reset_camera();
    assert!((state.camera().position() - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
    assert_eq!(state.camera().velocity(), Vec2::ZERO);
}

#[test]
fn default_starfield_respects_exclusion() {
    let scene = SceneBuilder::new(
        SceneSettings {
            star_seed: Some(77),
            ..SceneSettings::default()
        },
        DiskStyle::default(),
    )
    .build();
    assert!((9_900..=10_000).contains(&scene.stars.len()));
    assert!(scene
        .stars
        .positions
        .iter()
        .all(|p| Vec3::from_array(*p).length() > 100.0));
}

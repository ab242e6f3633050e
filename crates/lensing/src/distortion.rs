//! Screen-space gravitational lens.
//!
//! [`Lens::sample`] is the CPU twin of the distortion fragment program: given a
//! normalised screen coordinate it decides whether the pixel is inside the
//! horizon, escaped off the offscreen texture, or should sample the texture at
//! a displaced coordinate. Every pixel is evaluated independently.
//!
//! Coordinates use the bottom-left origin convention of the fragment stage;
//! [`composite`] takes care of flipping rows for top-left images.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::params::{guard_mass, ViewportSize};

/// Proportionality between the mass parameter and the on-screen horizon
/// radius, in aspect-corrected `[-1, 1]` units.
pub const SCHWARZSCHILD_SCALE: f32 = 0.005;

/// Opaque black written for horizon and escaped pixels.
pub const VOID: [u8; 4] = [0, 0, 0, 255];

/// Outcome of evaluating the lens for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LensSample {
    /// The pixel lies inside the horizon and is painted black without sampling.
    Horizon,
    /// The displaced coordinate left the offscreen texture.
    Escaped,
    /// Sample the offscreen texture at this `[0, 1]²` coordinate.
    Texel(Vec2),
}

/// Lens parameters for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    mass: f32,
    resolution: Vec2,
}

impl Lens {
    /// Builds a lens for the given mass and viewport. Non-positive or
    /// non-finite masses are replaced by the minimum guarded mass.
    pub fn new(mass: f32, viewport: ViewportSize) -> Self {
        Self {
            mass: guard_mass(mass),
            resolution: Vec2::new(viewport.width.max(1) as f32, viewport.height.max(1) as f32),
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn schwarzschild_radius(&self) -> f32 {
        self.mass * SCHWARZSCHILD_SCALE
    }

    fn aspect(&self) -> f32 {
        self.resolution.x / self.resolution.y
    }

    /// Bends an aspect-corrected point `p` toward the origin.
    ///
    /// Returns `None` when `p` is inside the horizon. The exact centre is
    /// returned untouched.
    pub fn deflect(&self, p: Vec2) -> Option<Vec2> {
        let len = p.length();
        if len <= 0.0 {
            return Some(p);
        }

        let radius = self.schwarzschild_radius();
        if len <= radius {
            return None;
        }

        let distortion = radius / len;
        Some(p - p / len * distortion)
    }

    /// Evaluates the lens at a normalised screen coordinate.
    pub fn sample(&self, uv: Vec2) -> LensSample {
        let aspect = self.aspect();
        let mut p = uv * 2.0 - Vec2::ONE;
        p.x *= aspect;

        let Some(mut q) = self.deflect(p) else {
            return LensSample::Horizon;
        };

        q.x /= aspect;
        let texel = q * 0.5 + Vec2::splat(0.5);

        if texel.x < 0.0 || texel.x > 1.0 || texel.y < 0.0 || texel.y > 1.0 {
            LensSample::Escaped
        } else {
            LensSample::Texel(texel)
        }
    }
}

/// Applies the lens to a whole image with nearest-neighbour sampling.
///
/// The output has the same dimensions as `source`; each output pixel depends
/// only on its own coordinate and the source image.
pub fn composite(source: &RgbaImage, mass: f32) -> RgbaImage {
    let (width, height) = source.dimensions();
    let lens = Lens::new(mass, ViewportSize::new(width, height));

    RgbaImage::from_fn(width, height, |x, y| {
        let uv = Vec2::new(
            (x as f32 + 0.5) / width as f32,
            1.0 - (y as f32 + 0.5) / height as f32,
        );
        match lens.sample(uv) {
            LensSample::Horizon | LensSample::Escaped => Rgba(VOID),
            LensSample::Texel(texel) => {
                let sx = ((texel.x * width as f32) as u32).min(width - 1);
                let sy = (((1.0 - texel.y) * height as f32) as u32).min(height - 1);
                *source.get_pixel(sx, sy)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(mass: f32) -> Lens {
        Lens::new(mass, ViewportSize::new(800, 600))
    }

    #[test]
    fn centre_pixel_is_undistorted() {
        let lens = lens(50.0);
        assert_eq!(lens.deflect(Vec2::ZERO), Some(Vec2::ZERO));
        assert_eq!(
            lens.sample(Vec2::splat(0.5)),
            LensSample::Texel(Vec2::splat(0.5))
        );
    }

    #[test]
    fn points_inside_horizon_are_black() {
        for mass in [1.0_f32, 10.0, 50.0, 200.0] {
            let lens = lens(mass);
            let radius = lens.schwarzschild_radius();
            for step in 1..=8 {
                let len = radius * step as f32 / 8.0;
                let direction = Vec2::from_angle(step as f32 * 0.7);
                assert_eq!(lens.deflect(direction * len), None, "mass {mass} len {len}");
            }
        }
    }

    #[test]
    fn displacement_magnitude_is_inverse_distance() {
        for mass in [1.0_f32, 25.0, 120.0] {
            let lens = lens(mass);
            let radius = lens.schwarzschild_radius();
            for p in [
                Vec2::new(0.9, 0.1),
                Vec2::new(-0.4, 0.7),
                Vec2::new(0.0, -1.2),
                Vec2::new(1.3, 0.95),
            ] {
                let q = lens.deflect(p).expect("outside horizon");
                let len = p.length();
                assert!(((p - q).length() - radius / len).abs() < 1e-5);
                // Pulled straight toward the origin.
                assert!(p.perp_dot(q).abs() < 1e-5);
                assert!(q.length() < len);
            }
        }
    }

    #[test]
    fn lens_strength_grows_with_mass_and_fades_with_distance() {
        let p = Vec2::new(0.6, 0.3);
        let light = (p - lens(10.0).deflect(p).unwrap()).length();
        let heavy = (p - lens(90.0).deflect(p).unwrap()).length();
        assert!(heavy > light);

        let near = Vec2::new(0.5, 0.0);
        let far = Vec2::new(1.0, 0.0);
        let lens = lens(40.0);
        let near_shift = (near - lens.deflect(near).unwrap()).length();
        let far_shift = (far - lens.deflect(far).unwrap()).length();
        assert!(near_shift > far_shift);
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let lens = lens(73.0);
        for uv in [Vec2::new(0.1, 0.9), Vec2::new(0.52, 0.47), Vec2::new(0.99, 0.01)] {
            let a = lens.sample(uv);
            let b = lens.sample(uv);
            match (a, b) {
                (LensSample::Texel(x), LensSample::Texel(y)) => {
                    assert_eq!(x.x.to_bits(), y.x.to_bits());
                    assert_eq!(x.y.to_bits(), y.y.to_bits());
                }
                (x, y) => assert_eq!(x, y),
            }
        }
    }

    #[test]
    fn non_positive_mass_is_guarded() {
        for mass in [0.0_f32, -5.0, f32::NAN] {
            let lens = lens(mass);
            assert!(lens.mass() > 0.0);
            assert!(lens.schwarzschild_radius() > 0.0);
            match lens.sample(Vec2::new(0.7, 0.4)) {
                LensSample::Texel(texel) => assert!(texel.is_finite()),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn aspect_correction_keeps_horizon_circular() {
        let lens = lens(50.0);
        let radius = lens.schwarzschild_radius();
        let aspect = 800.0 / 600.0;
        // Just inside the horizon horizontally and vertically.
        let horizontal = Vec2::new(0.5 + radius * 0.95 / (2.0 * aspect), 0.5);
        let vertical = Vec2::new(0.5, 0.5 + radius * 0.95 / 2.0);
        assert_eq!(lens.sample(horizontal), LensSample::Horizon);
        assert_eq!(lens.sample(vertical), LensSample::Horizon);
        // Just outside both ways.
        let horizontal = Vec2::new(0.5 + radius * 1.05 / (2.0 * aspect), 0.5);
        let vertical = Vec2::new(0.5, 0.5 + radius * 1.05 / 2.0);
        assert!(matches!(lens.sample(horizontal), LensSample::Texel(_)));
        assert!(matches!(lens.sample(vertical), LensSample::Texel(_)));
    }

    #[test]
    fn composite_preserves_dimensions() {
        let source = RgbaImage::from_pixel(64, 48, Rgba([10, 20, 30, 255]));
        let output = composite(&source, 50.0);
        assert_eq!(output.dimensions(), (64, 48));
        assert_eq!(*output.get_pixel(32, 24), Rgba(VOID));
    }
}

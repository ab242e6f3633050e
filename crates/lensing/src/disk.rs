//! CPU reference for the accretion disk fragment stage.
//!
//! The GLSL program in the renderer crate evaluates exactly this per fragment.
//! Output is premultiplied (`rgb` already scaled by intensity) and is meant to
//! be composited additively so the disk glows on top of whatever is behind it.

use glam::{Vec2, Vec3, Vec4};

use crate::noise::simplex3;

/// Colour at the inner rim.
pub const WARM: Vec3 = Vec3::new(1.0, 0.8, 0.2);
/// Colour toward the outer rim.
pub const HOT: Vec3 = Vec3::new(1.0, 0.2, 0.0);

/// Spatial frequency of the noise lookup.
pub const NOISE_SCALE: f32 = 5.0;
/// Rate at which the noise field scrolls through its third axis.
pub const NOISE_SPEED: f32 = 0.2;
/// Global opacity applied after the annulus mask.
pub const DISK_OPACITY: f32 = 0.9;

/// GLSL `smoothstep`; `edge0 > edge1` yields the mirrored ramp.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shades a disk-local coordinate in `[-1, 1]²` at `time` seconds.
pub fn shade(coord: Vec2, time: f32) -> Vec4 {
    let r = coord.length();
    let noise = simplex3(Vec3::new(
        coord.x * NOISE_SCALE,
        coord.y * NOISE_SCALE,
        time * NOISE_SPEED,
    ));
    let noise = (noise + 1.0) * 0.5;

    let r_norm = (r - 0.5) / 0.5;
    let color = WARM.lerp(HOT, r_norm);

    let falloff = 1.0 - r_norm;
    let intensity = falloff * falloff * (0.5 + noise * 0.5);

    let alpha = smoothstep(1.0, 0.95, r) * smoothstep(0.5, 0.55, r);

    (color * intensity).extend(alpha * DISK_OPACITY)
}

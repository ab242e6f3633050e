//! 3D simplex gradient noise.
//!
//! Mirrors the `snoise` routine compiled into the disk fragment shader so the
//! CPU reference and the GPU agree on the plasma pattern. The lattice hash is
//! the usual `mod 289` permutation polynomial; no tables are involved, which is
//! what makes the function cheap enough to evaluate once per covered pixel.

use glam::{Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + Vec4::ONE) * x)
}

fn taylor_inv_sqrt(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - r * 0.853_734_7
}

/// GLSL `step(edge, x)`: 0.0 where `x < edge`, 1.0 otherwise.
fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmplt(edge), Vec3::ZERO, Vec3::ONE)
}

fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmplt(edge), Vec4::ZERO, Vec4::ONE)
}

/// Samples simplex noise at `v`. The result stays within roughly `[-1, 1]`.
pub fn simplex3(v: Vec3) -> f32 {
    const C_X: f32 = 1.0 / 6.0;
    const C_Y: f32 = 1.0 / 3.0;
    let d = Vec4::new(0.0, 0.5, 1.0, 2.0);

    // Skew into the simplex lattice and find the first corner.
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(C_Y)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(C_X)));

    let g = step3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(C_X);
    let x2 = x0 - i2 + Vec3::splat(C_Y);
    let x3 = x0 - Vec3::splat(d.y);

    i = mod289_3(i);
    let p = permute(
        permute(
            permute(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients are spread over a 7x7 grid folded onto an octahedron.
    let n_ = 0.142_857_15_f32;
    let ns = d.wyz() * n_ - d.xzx();

    let j = p - (p * ns.z * ns.z).floor() * 49.0;
    let x_ = (j * ns.z).floor();
    let y_ = (j - x_ * 7.0).floor();

    let x = x_ * ns.x + Vec4::splat(ns.y);
    let y = y_ * ns.x + Vec4::splat(ns.y);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt(Vec4::new(
        p0.dot(p0),
        p1.dot(p1),
        p2.dot(p2),
        p3.dot(p3),
    ));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let m = (Vec4::splat(0.6)
        - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
    .max(Vec4::ZERO);
    let m = m * m;
    42.0 * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice_walk() -> impl Iterator<Item = Vec3> {
        (0..2000).map(|index| {
            let t = index as f32;
            Vec3::new(
                (t * 0.137).sin() * 7.3 + t * 0.011,
                (t * 0.071).cos() * 5.1 - t * 0.023,
                t * 0.019,
            )
        })
    }

    #[test]
    fn lattice_hash_repeats_every_289_units() {
        for point in lattice_walk().take(32) {
            let shifted = point + Vec3::splat(289.0);
            assert!((simplex3(point) - simplex3(shifted)).abs() < 1e-2);
        }
    }

    #[test]
    fn equal_inputs_give_equal_outputs() {
        for point in lattice_walk().take(64) {
            assert_eq!(simplex3(point).to_bits(), simplex3(point).to_bits());
        }
    }

    #[test]
    fn output_stays_bounded() {
        for point in lattice_walk() {
            let value = simplex3(point);
            assert!(value.is_finite());
            assert!(value.abs() <= 1.05, "noise {value} out of range at {point:?}");
        }
    }

    #[test]
    fn small_steps_produce_small_changes() {
        for point in lattice_walk().take(200) {
            let nudged = point + Vec3::splat(1e-3);
            let delta = (simplex3(point) - simplex3(nudged)).abs();
            assert!(delta < 0.05, "discontinuity of {delta} near {point:?}");
        }
    }

    #[test]
    fn pattern_is_not_flat() {
        let values: Vec<f32> = lattice_walk().map(simplex3).collect();
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        assert!(max - min > 0.5);
    }
}

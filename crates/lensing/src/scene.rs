//! Scene construction: starfield, occluder and disk geometry.
//!
//! Topology is fixed once [`SceneBuilder::build`] returns; the only state that
//! changes afterwards is the pair of rotation angles advanced by
//! [`SceneGraph::advance`].

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::environment::DiskStyle;

/// Disk spin about its own normal, radians per rendered frame.
pub const DISK_SPIN_PER_FRAME: f32 = 0.005;
/// Starfield drift about the vertical axis, radians per rendered frame.
pub const STAR_DRIFT_PER_FRAME: f32 = 0.0001;

/// Interleaved mesh vertex uploaded as-is to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.normalize_or_zero().to_array(),
            uv,
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Latitude/longitude sphere centred on the origin.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        let mut indices = Vec::new();

        for lat in 0..=height_segments {
            let v = lat as f32 / height_segments as f32;
            let polar = v * PI;
            for lon in 0..=width_segments {
                let u = lon as f32 / width_segments as f32;
                let azimuth = u * TAU;
                let normal = Vec3::new(
                    -azimuth.cos() * polar.sin(),
                    polar.cos(),
                    azimuth.sin() * polar.sin(),
                );
                vertices.push(Vertex::new(normal * radius, normal, [u, 1.0 - v]));
            }
        }

        let stride = width_segments + 1;
        for lat in 0..height_segments {
            for lon in 0..width_segments {
                let a = lat * stride + lon + 1;
                let b = lat * stride + lon;
                let c = (lat + 1) * stride + lon;
                let d = (lat + 1) * stride + lon + 1;
                // Pole rows collapse to single triangles.
                if lat != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if lat != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Flat annulus in the XY plane.
    ///
    /// UVs map the local position divided by `outer` onto `[0, 1]²`, so the
    /// disk shader sees `r = 1` on the outer rim and `r = inner / outer` on the
    /// inner one.
    pub fn ring(inner: f32, outer: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(2 * (segments as usize + 1));
        let mut indices = Vec::with_capacity(6 * segments as usize);

        for radius in [inner, outer] {
            for step in 0..=segments {
                let angle = step as f32 / segments as f32 * TAU;
                let position = Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
                let uv = [
                    (position.x / outer + 1.0) * 0.5,
                    (position.y / outer + 1.0) * 0.5,
                ];
                vertices.push(Vertex::new(position, Vec3::Z, uv));
            }
        }

        for step in 0..segments {
            let a = step;
            let b = step + segments + 1;
            let c = step + segments + 2;
            let d = step + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        Self { vertices, indices }
    }

    /// Torus around the Z axis with ring radius `radius` and tube radius `tube`.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial_segments = radial_segments.max(3);
        let tubular_segments = tubular_segments.max(3);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            for i in 0..=tubular_segments {
                let u = i as f32 / tubular_segments as f32 * TAU;
                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let centre = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                vertices.push(Vertex::new(
                    position,
                    position - centre,
                    [
                        i as f32 / tubular_segments as f32,
                        j as f32 / radial_segments as f32,
                    ],
                ));
            }
        }

        let stride = tubular_segments + 1;
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = stride * j + i - 1;
                let b = stride * (j - 1) + i - 1;
                let c = stride * (j - 1) + i;
                let d = stride * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self { vertices, indices }
    }
}

/// Static point cloud of background stars.
#[derive(Debug, Clone, Default)]
pub struct Starfield {
    pub positions: Vec<[f32; 3]>,
}

impl Starfield {
    /// Draws `samples` candidates uniformly from a cube of half-extent
    /// `extent` and keeps those strictly farther than `exclusion` from the
    /// origin. Rejected candidates are not retried.
    pub fn generate<R: Rng>(rng: &mut R, samples: usize, extent: f32, exclusion: f32) -> Self {
        let exclusion_sq = exclusion * exclusion;
        let positions = (0..samples)
            .map(|_| {
                Vec3::new(
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                )
            })
            .filter(|point| point.length_squared() > exclusion_sq)
            .map(|v| v.to_array())
            .collect();
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Sizing knobs for [`SceneBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    pub star_samples: usize,
    pub star_extent: f32,
    pub star_exclusion_radius: f32,
    /// Fixed RNG seed; `None` draws a fresh starfield every run.
    pub star_seed: Option<u64>,
    pub occluder_radius: f32,
    pub occluder_segments: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            star_samples: 10_000,
            star_extent: 1000.0,
            star_exclusion_radius: 100.0,
            star_seed: None,
            occluder_radius: 2.0,
            occluder_segments: 64,
        }
    }
}

/// Which shading path the disk mesh expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    Procedural,
    Textured,
}

/// Everything drawn by the scene pass.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub stars: Starfield,
    pub occluder: Mesh,
    pub disk: Mesh,
    pub disk_kind: DiskKind,
    disk_rotation: f32,
    star_rotation: f32,
}

impl SceneGraph {
    /// Applies one frame of rotation. Increments are per frame, not per
    /// second, so spin speed follows the display rate.
    pub fn advance(&mut self) {
        self.disk_rotation = (self.disk_rotation + DISK_SPIN_PER_FRAME).rem_euclid(TAU);
        self.star_rotation = (self.star_rotation + STAR_DRIFT_PER_FRAME).rem_euclid(TAU);
    }

    pub fn disk_rotation(&self) -> f32 {
        self.disk_rotation
    }

    pub fn star_rotation(&self) -> f32 {
        self.star_rotation
    }

    /// Lays the disk flat (normal along +Y) and spins it about that normal.
    pub fn disk_model(&self) -> Mat4 {
        Mat4::from_rotation_x(FRAC_PI_2) * Mat4::from_rotation_z(self.disk_rotation)
    }

    pub fn star_model(&self) -> Mat4 {
        Mat4::from_rotation_y(self.star_rotation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    settings: SceneSettings,
    disk: DiskStyle,
}

impl SceneBuilder {
    pub fn new(settings: SceneSettings, disk: DiskStyle) -> Self {
        Self { settings, disk }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn build(&self) -> SceneGraph {
        let settings = &self.settings;
        let mut rng = match settings.star_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let stars = Starfield::generate(
            &mut rng,
            settings.star_samples,
            settings.star_extent,
            settings.star_exclusion_radius,
        );
        tracing::debug!(
            requested = settings.star_samples,
            accepted = stars.len(),
            "generated starfield"
        );

        let occluder = Mesh::sphere(
            settings.occluder_radius,
            settings.occluder_segments,
            settings.occluder_segments,
        );

        let (disk, disk_kind) = match &self.disk {
            DiskStyle::Procedural {
                inner_radius,
                outer_radius,
                segments,
            } => (
                Mesh::ring(*inner_radius, *outer_radius, *segments),
                DiskKind::Procedural,
            ),
            DiskStyle::TexturedTorus { radius, tube, .. } => {
                (Mesh::torus(*radius, *tube, 16, 100), DiskKind::Textured)
            }
        };

        SceneGraph {
            stars,
            occluder,
            disk,
            disk_kind,
            disk_rotation: 0.0,
            star_rotation: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SceneBuilder {
        SceneBuilder::new(
            SceneSettings {
                star_seed: Some(seed),
                ..SceneSettings::default()
            },
            DiskStyle::default(),
        )
    }

    #[test]
    fn stars_clear_the_exclusion_shell() {
        let scene = seeded(7).build();
        for position in &scene.stars.positions {
            assert!(Vec3::from_array(*position).length() > 100.0);
            for axis in position {
                assert!(axis.abs() <= 1000.0);
            }
        }
    }

    #[test]
    fn star_count_is_close_to_requested() {
        // Roughly 0.05% of the cube lies inside the exclusion sphere.
        let scene = seeded(11).build();
        let accepted = scene.stars.len();
        assert!(accepted <= 10_000);
        assert!(accepted >= 9_900, "only {accepted} stars accepted");
    }

    #[test]
    fn rejection_is_not_retried() {
        let mut rng = StdRng::seed_from_u64(3);
        // Exclusion covers most of the cube, so most samples are dropped.
        let stars = Starfield::generate(&mut rng, 1000, 10.0, 15.0);
        assert!(stars.len() < 1000);
        assert!(stars
            .positions
            .iter()
            .all(|p| Vec3::from_array(*p).length() > 15.0));
    }

    #[test]
    fn same_seed_same_sky() {
        let a = seeded(42).build();
        let b = seeded(42).build();
        assert_eq!(a.stars.positions, b.stars.positions);
    }

    #[test]
    fn sphere_vertices_sit_on_radius() {
        let mesh = Mesh::sphere(2.0, 64, 64);
        for vertex in &mesh.vertices {
            let length = Vec3::from_array(vertex.position).length();
            assert!((length - 2.0).abs() < 1e-4);
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(mesh.triangle_count(), 64 * 64 * 2 - 2 * 64);
    }

    #[test]
    fn ring_uvs_encode_normalised_radius() {
        let mesh = Mesh::ring(2.5, 5.0, 64);
        for vertex in &mesh.vertices {
            let local = glam::Vec2::new(vertex.uv[0], vertex.uv[1]) * 2.0 - glam::Vec2::ONE;
            let radius = Vec3::from_array(vertex.position).length();
            assert!((local.length() - radius / 5.0).abs() < 1e-5);
        }
        assert_eq!(mesh.triangle_count(), 128);
    }

    #[test]
    fn torus_stays_within_tube() {
        let mesh = Mesh::torus(4.0, 1.0, 16, 100);
        for vertex in &mesh.vertices {
            let p = Vec3::from_array(vertex.position);
            let planar = glam::Vec2::new(p.x, p.y).length();
            let tube_distance = glam::Vec2::new(planar - 4.0, p.z).length();
            assert!((tube_distance - 1.0).abs() < 1e-4);
        }
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn disk_lies_flat_and_spins_about_vertical() {
        let mut scene = seeded(1).build();
        let normal = scene.disk_model().transform_vector3(Vec3::Z);
        assert!((normal.abs() - Vec3::Y).length() < 1e-5);

        scene.advance();
        scene.advance();
        assert!((scene.disk_rotation() - 2.0 * DISK_SPIN_PER_FRAME).abs() < 1e-7);
        assert!((scene.star_rotation() - 2.0 * STAR_DRIFT_PER_FRAME).abs() < 1e-7);
        let spun_normal = scene.disk_model().transform_vector3(Vec3::Z);
        assert!((spun_normal - normal).length() < 1e-5);
    }

    #[test]
    fn textured_style_builds_torus() {
        let builder = SceneBuilder::new(
            SceneSettings {
                star_seed: Some(5),
                star_samples: 10,
                ..SceneSettings::default()
            },
            DiskStyle::TexturedTorus {
                radius: 4.0,
                tube: 1.0,
                texture: "disk.png".into(),
            },
        );
        let scene = builder.build();
        assert_eq!(scene.disk_kind, DiskKind::Textured);
        assert!(!scene.disk.vertices.is_empty());
    }
}

use std::path::PathBuf;

/// What fills the scene behind the stars.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    /// Plain clear colour (linear RGB).
    Solid { color: [f32; 3] },
    /// Photographic sky wrapped around the camera as longitude/latitude.
    Equirectangular { image: PathBuf },
}

impl Default for Background {
    fn default() -> Self {
        Self::Solid {
            color: [0.0, 0.0, 0.0],
        }
    }
}

/// How the luminous disk is built and shaded.
#[derive(Debug, Clone, PartialEq)]
pub enum DiskStyle {
    /// Flat ring shaded procedurally with animated noise.
    Procedural {
        inner_radius: f32,
        outer_radius: f32,
        segments: u32,
    },
    /// Torus sampling an image texture.
    TexturedTorus {
        radius: f32,
        tube: f32,
        texture: PathBuf,
    },
}

impl Default for DiskStyle {
    fn default() -> Self {
        Self::Procedural {
            inner_radius: 2.5,
            outer_radius: 5.0,
            segments: 64,
        }
    }
}

/// Background and disk strategy pair selected at start-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    pub background: Background,
    pub disk: DiskStyle,
}

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Upper end of the mass range accepted from configuration.
pub const MAX_MASS: f32 = 200.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LensConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default)]
    pub environment: EnvironmentSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub window: WindowSection,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            simulation: SimulationSection::default(),
            scene: SceneSection::default(),
            environment: EnvironmentSection::default(),
            render: RenderSection::default(),
            window: WindowSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    pub mass: f32,
    pub show_disk: bool,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            mass: 50.0,
            show_disk: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSection {
    pub star_count: usize,
    pub star_extent: f32,
    pub star_exclusion_radius: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_seed: Option<u64>,
    pub occluder_radius: f32,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            star_count: 10_000,
            star_extent: 1000.0,
            star_exclusion_radius: 100.0,
            star_seed: None,
            occluder_radius: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSection {
    pub background: BackgroundConfig,
    pub disk: DiskConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackgroundConfig {
    Solid {
        #[serde(default)]
        color: [f32; 3],
    },
    Equirectangular {
        image: PathBuf,
    },
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self::Solid {
            color: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DiskConfig {
    Procedural {
        #[serde(default = "default_inner_radius")]
        inner_radius: f32,
        #[serde(default = "default_outer_radius")]
        outer_radius: f32,
        #[serde(default = "default_ring_segments")]
        segments: u32,
    },
    TexturedTorus {
        #[serde(default = "default_torus_radius")]
        radius: f32,
        #[serde(default = "default_torus_tube")]
        tube: f32,
        texture: PathBuf,
    },
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::Procedural {
            inner_radius: default_inner_radius(),
            outer_radius: default_outer_radius(),
            segments: default_ring_segments(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSection {
    /// Frame cap; `0` or absent means uncapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    pub antialias: AntialiasSetting,
    pub vsync: bool,
    pub power: PowerSetting,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            fps: None,
            antialias: AntialiasSetting::Auto,
            vsync: true,
            power: PowerSetting::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    pub fn from_samples(samples: u32) -> Option<Self> {
        match samples {
            0 | 1 => Some(Self::Off),
            2 => Some(Self::Samples2),
            4 => Some(Self::Samples4),
            8 => Some(Self::Samples8),
            16 => Some(Self::Samples16),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Off => "off",
            Self::Samples2 => "2",
            Self::Samples4 => "4",
            Self::Samples8 => "8",
            Self::Samples16 => "16",
        }
    }
}

impl fmt::Display for AntialiasSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_antialias(raw)
    }
}

impl Serialize for AntialiasSetting {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AntialiasSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => parse_antialias(&raw).map_err(de::Error::custom),
            Helper::Num(value) => {
                if value < 0 {
                    return Err(de::Error::custom("antialias value must be non-negative"));
                }
                u32::try_from(value)
                    .ok()
                    .and_then(AntialiasSetting::from_samples)
                    .ok_or_else(|| {
                        de::Error::custom(format!("invalid antialias sample count {value}"))
                    })
            }
        }
    }
}

fn parse_antialias(raw: &str) -> Result<AntialiasSetting, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(AntialiasSetting::Auto),
        "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(AntialiasSetting::Off),
        "2" => Ok(AntialiasSetting::Samples2),
        "4" => Ok(AntialiasSetting::Samples4),
        "8" => Ok(AntialiasSetting::Samples8),
        "16" => Ok(AntialiasSetting::Samples16),
        other => Err(format!("invalid antialias setting '{other}'")),
    }
}

fn default_version() -> u32 {
    1
}

fn default_inner_radius() -> f32 {
    2.5
}

fn default_outer_radius() -> f32 {
    5.0
}

fn default_ring_segments() -> u32 {
    64
}

fn default_torus_radius() -> f32 {
    4.0
}

fn default_torus_tube() -> f32 {
    1.0
}

impl LensConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LensConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Rebases relative image paths onto `base`, normally the directory the
    /// configuration file was read from.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let BackgroundConfig::Equirectangular { image } = &mut self.environment.background {
            rebase(image);
        }
        if let DiskConfig::TexturedTorus { texture, .. } = &mut self.environment.disk {
            rebase(texture);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let mass = self.simulation.mass;
        if !mass.is_finite() || mass <= 0.0 || mass > MAX_MASS {
            return Err(ConfigError::Invalid(format!(
                "simulation.mass must be in (0, {MAX_MASS}], got {mass}"
            )));
        }

        let scene = &self.scene;
        if !scene.star_extent.is_finite() || scene.star_extent <= 0.0 {
            return Err(ConfigError::Invalid(
                "scene.star_extent must be > 0".into(),
            ));
        }
        if !scene.star_exclusion_radius.is_finite() || scene.star_exclusion_radius < 0.0 {
            return Err(ConfigError::Invalid(
                "scene.star_exclusion_radius must be >= 0".into(),
            ));
        }
        // The exclusion sphere swallows the whole cube once it reaches the corners.
        if scene.star_exclusion_radius >= scene.star_extent * 3.0_f32.sqrt() {
            return Err(ConfigError::Invalid(format!(
                "scene.star_exclusion_radius {} leaves no room for stars within extent {}",
                scene.star_exclusion_radius, scene.star_extent
            )));
        }
        if !scene.occluder_radius.is_finite() || scene.occluder_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "scene.occluder_radius must be > 0".into(),
            ));
        }

        let inner_extent = match &self.environment.disk {
            DiskConfig::Procedural {
                inner_radius,
                outer_radius,
                segments,
            } => {
                if !inner_radius.is_finite() || !outer_radius.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "environment.disk radii must be finite, got {inner_radius} and {outer_radius}"
                    )));
                }
                if inner_radius >= outer_radius {
                    return Err(ConfigError::Invalid(format!(
                        "environment.disk inner_radius {inner_radius} must be smaller than outer_radius {outer_radius}"
                    )));
                }
                if *segments < 3 {
                    return Err(ConfigError::Invalid(
                        "environment.disk segments must be >= 3".into(),
                    ));
                }
                *inner_radius
            }
            DiskConfig::TexturedTorus {
                radius,
                tube,
                texture,
            } => {
                if !radius.is_finite() || !tube.is_finite() || *tube <= 0.0 || tube >= radius {
                    return Err(ConfigError::Invalid(format!(
                        "environment.disk tube {tube} must be > 0 and smaller than radius {radius}"
                    )));
                }
                if texture.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(
                        "environment.disk texture may not be empty".into(),
                    ));
                }
                radius - tube
            }
        };
        if inner_extent <= scene.occluder_radius {
            return Err(ConfigError::Invalid(format!(
                "environment.disk reaches inside the occluder (inner edge {inner_extent}, occluder radius {})",
                scene.occluder_radius
            )));
        }

        if let BackgroundConfig::Equirectangular { image } = &self.environment.background {
            if image.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "environment.background image may not be empty".into(),
                ));
            }
        }

        if let Some(fps) = self.render.fps {
            if fps < 0.0 || fps.is_nan() {
                return Err(ConfigError::Invalid("render.fps must be >= 0".into()));
            }
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be > 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[simulation]
mass = 120
show_disk = false

[scene]
star_count = 2500
star_seed = 42

[environment.background]
kind = "equirectangular"
image = "sky/milkyway.jpg"

[environment.disk]
kind = "textured-torus"
radius = 4.5
tube = 1.2
texture = "disk.png"

[render]
fps = 30
antialias = 4
vsync = false
power = "low"
"#;

    #[test]
    fn empty_document_yields_defaults() {
        let config = LensConfig::from_toml_str("").expect("parse config");
        assert_eq!(config, LensConfig::default());
        assert_eq!(config.simulation.mass, 50.0);
        assert!(config.simulation.show_disk);
        assert_eq!(config.environment.disk, DiskConfig::default());
    }

    #[test]
    fn parses_sample_config() {
        let config = LensConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.simulation.mass, 120.0);
        assert!(!config.simulation.show_disk);
        assert_eq!(config.scene.star_count, 2500);
        assert_eq!(config.scene.star_seed, Some(42));
        assert_eq!(config.scene.star_extent, 1000.0);
        assert_eq!(
            config.environment.background,
            BackgroundConfig::Equirectangular {
                image: PathBuf::from("sky/milkyway.jpg")
            }
        );
        assert_eq!(config.render.fps, Some(30.0));
        assert_eq!(config.render.antialias, AntialiasSetting::Samples4);
        assert_eq!(config.render.power, PowerSetting::Low);
        assert!(!config.render.vsync);
    }

    #[test]
    fn procedural_disk_fills_missing_radii() {
        let config = LensConfig::from_toml_str(
            r#"
[environment.disk]
kind = "procedural"
outer_radius = 7.5
"#,
        )
        .expect("parse config");
        assert_eq!(
            config.environment.disk,
            DiskConfig::Procedural {
                inner_radius: 2.5,
                outer_radius: 7.5,
                segments: 64,
            }
        );
    }

    #[test]
    fn rejects_wrong_version() {
        let err = LensConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_mass() {
        for mass in ["0", "-4", "250"] {
            let err = LensConfig::from_toml_str(&format!("[simulation]\nmass = {mass}\n"))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "mass {mass}");
        }
    }

    #[test]
    fn rejects_inverted_ring() {
        let err = LensConfig::from_toml_str(
            r#"
[environment.disk]
kind = "procedural"
inner_radius = 6
outer_radius = 5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_finite_geometry() {
        let cases = [
            "[scene]\nstar_exclusion_radius = nan\n",
            "[environment.disk]\nkind = \"procedural\"\ninner_radius = nan\n",
            "[environment.disk]\nkind = \"procedural\"\nouter_radius = inf\n",
            "[environment.disk]\nkind = \"textured-torus\"\nradius = inf\ntexture = \"disk.png\"\n",
            "[environment.disk]\nkind = \"textured-torus\"\ntube = nan\ntexture = \"disk.png\"\n",
        ];
        for case in cases {
            let err = LensConfig::from_toml_str(case).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted {case:?}");
        }
    }

    #[test]
    fn rejects_disk_inside_occluder() {
        let err = LensConfig::from_toml_str(
            r#"
[scene]
occluder_radius = 3.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_exclusion_covering_cube() {
        let err = LensConfig::from_toml_str(
            r#"
[scene]
star_extent = 10
star_exclusion_radius = 20
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_fps_and_bad_antialias() {
        let err = LensConfig::from_toml_str("[render]\nfps = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = LensConfig::from_toml_str("[render]\nantialias = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = LensConfig::from_toml_str("[simulation]\nmas = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialised_config_parses_back() {
        let config = LensConfig::from_toml_str(SAMPLE).expect("parse config");
        let text = config.to_toml_string().expect("serialise");
        let reparsed = LensConfig::from_toml_str(&text).expect("reparse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn relative_images_follow_config_dir() {
        let mut config = LensConfig::from_toml_str(SAMPLE).expect("parse config");
        config.resolve_paths(Path::new("/etc/chronolens"));
        assert_eq!(
            config.environment.background,
            BackgroundConfig::Equirectangular {
                image: PathBuf::from("/etc/chronolens/sky/milkyway.jpg")
            }
        );
        match &config.environment.disk {
            DiskConfig::TexturedTorus { texture, .. } => {
                assert_eq!(texture, Path::new("/etc/chronolens/disk.png"));
            }
            other => panic!("unexpected disk {other:?}"),
        }
    }

    #[test]
    fn antialias_accepts_strings_and_numbers() {
        assert_eq!("auto".parse::<AntialiasSetting>(), Ok(AntialiasSetting::Auto));
        assert_eq!(" Off ".parse::<AntialiasSetting>(), Ok(AntialiasSetting::Off));
        assert_eq!("16".parse::<AntialiasSetting>(), Ok(AntialiasSetting::Samples16));
        assert!("12".parse::<AntialiasSetting>().is_err());
        assert_eq!(AntialiasSetting::from_samples(8), Some(AntialiasSetting::Samples8));
        let config = LensConfig::from_toml_str("[render]\nantialias = 16\n").expect("parse");
        assert_eq!(config.render.antialias, AntialiasSetting::Samples16);
    }
}

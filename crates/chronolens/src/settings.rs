use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lensconfig::{AntialiasSetting, BackgroundConfig, DiskConfig, LensConfig, PowerSetting};
use lensing::{
    Background, DiskStyle, Environment, SceneSettings, SharedParameters, SimulationParameters,
};
use renderer::{Antialiasing, GpuPowerPreference, RendererConfig};

use crate::cli::{parse_window_size, RunArgs};

/// Reads `path`, or returns defaults when it does not exist. Relative image
/// paths are resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<LensConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file; using defaults");
        return Ok(LensConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration at {}", path.display()))?;
    let mut config = LensConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid configuration at {}", path.display()))?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Folds command-line flags into `config` and re-validates the result.
pub fn apply_overrides(config: &mut LensConfig, args: &RunArgs) -> Result<()> {
    if let Some(mass) = args.mass {
        config.simulation.mass = mass;
    }
    if args.hide_disk {
        config.simulation.show_disk = false;
    }
    if let Some(size) = args.size.as_deref() {
        let (width, height) = parse_window_size(size)?;
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(fps) = args.fps {
        config.render.fps = Some(fps);
    }
    if let Some(antialias) = args.antialias {
        config.render.antialias = antialias;
    }
    if args.no_vsync {
        config.render.vsync = false;
    }
    if args.low_power {
        config.render.power = PowerSetting::Low;
    }
    if let Some(image) = args.background.as_ref() {
        config.environment.background = BackgroundConfig::Equirectangular {
            image: absolute(image)?,
        };
    }
    if let Some(texture) = args.disk_texture.as_ref() {
        let (radius, tube) = match &config.environment.disk {
            DiskConfig::TexturedTorus { radius, tube, .. } => (*radius, *tube),
            DiskConfig::Procedural { .. } => (4.0, 1.0),
        };
        config.environment.disk = DiskConfig::TexturedTorus {
            radius,
            tube,
            texture: absolute(texture)?,
        };
    }
    if let Some(stars) = args.stars {
        config.scene.star_count = stars;
    }
    if let Some(seed) = args.seed {
        config.scene.star_seed = Some(seed);
    }

    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    Ok(cwd.join(path))
}

/// Translates a validated configuration into the renderer's start-up input.
pub fn renderer_config(config: &LensConfig) -> RendererConfig {
    let background = match &config.environment.background {
        BackgroundConfig::Solid { color } => Background::Solid { color: *color },
        BackgroundConfig::Equirectangular { image } => Background::Equirectangular {
            image: image.clone(),
        },
    };
    let disk = match &config.environment.disk {
        DiskConfig::Procedural {
            inner_radius,
            outer_radius,
            segments,
        } => DiskStyle::Procedural {
            inner_radius: *inner_radius,
            outer_radius: *outer_radius,
            segments: *segments,
        },
        DiskConfig::TexturedTorus {
            radius,
            tube,
            texture,
        } => DiskStyle::TexturedTorus {
            radius: *radius,
            tube: *tube,
            texture: texture.clone(),
        },
    };

    let scene = SceneSettings {
        star_samples: config.scene.star_count,
        star_extent: config.scene.star_extent,
        star_exclusion_radius: config.scene.star_exclusion_radius,
        star_seed: config.scene.star_seed,
        occluder_radius: config.scene.occluder_radius,
        ..SceneSettings::default()
    };

    RendererConfig {
        window_size: (config.window.width, config.window.height),
        title: "chronolens".into(),
        target_fps: config.render.fps,
        antialiasing: antialiasing(config.render.antialias),
        vsync: config.render.vsync,
        power: match config.render.power {
            PowerSetting::Low => GpuPowerPreference::Low,
            PowerSetting::High => GpuPowerPreference::High,
        },
        environment: Environment { background, disk },
        scene,
        parameters: SharedParameters::new(initial_parameters(config)),
    }
}

pub fn initial_parameters(config: &LensConfig) -> SimulationParameters {
    SimulationParameters::new(config.simulation.mass, config.simulation.show_disk)
}

fn antialiasing(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        AntialiasSetting::Off => Antialiasing::Off,
        AntialiasSetting::Samples2 => Antialiasing::Samples(2),
        AntialiasSetting::Samples4 => Antialiasing::Samples(4),
        AntialiasSetting::Samples8 => Antialiasing::Samples(8),
        AntialiasSetting::Samples16 => Antialiasing::Samples(16),
    }
}

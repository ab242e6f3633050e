use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lensconfig::AntialiasSetting;

#[derive(Parser, Debug)]
#[command(
    name = "chronolens",
    author,
    version,
    about = "Real-time gravitational lensing visualizer"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Overrides applied on top of the configuration file.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to use instead of the discovered `config.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Mass of the lens, greater than 0 and at most 200.
    #[arg(long, value_name = "MASS", global = true)]
    pub mass: Option<f32>,

    /// Start with the accretion disk hidden.
    #[arg(long, global = true)]
    pub hide_disk: bool,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", global = true)]
    pub size: Option<String>,

    /// Optional FPS cap (0=uncapped).
    #[arg(long, value_name = "FPS", global = true)]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Present without waiting for vertical sync.
    #[arg(long, global = true)]
    pub no_vsync: bool,

    /// Prefer the low-power GPU.
    #[arg(long, global = true)]
    pub low_power: bool,

    /// Equirectangular sky image used instead of the solid background.
    #[arg(long, value_name = "IMAGE", global = true)]
    pub background: Option<PathBuf>,

    /// Image for a textured torus disk instead of the procedural ring.
    #[arg(long, value_name = "IMAGE", global = true)]
    pub disk_texture: Option<PathBuf>,

    /// Number of star samples before exclusion.
    #[arg(long, value_name = "COUNT", global = true)]
    pub stars: Option<usize>,

    /// Seed for a reproducible starfield.
    #[arg(long, value_name = "SEED", global = true)]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect configuration.
    Config(ConfigCommand),
    /// Validate the built-in shader programs without opening a window.
    Shaders,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path that would be read.
    Where,
    /// Print the effective configuration (file plus flags) as TOML.
    Show,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_window_size(spec: &str) -> anyhow::Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("window dimensions must be greater than zero");
    }

    Ok((width, height))
}

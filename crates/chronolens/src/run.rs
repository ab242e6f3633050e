use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use lensing::{SharedParameters, SimulationParameters};
use renderer::{validate_builtin_programs, FrameLoop, WindowSignal, ALL_PROGRAMS};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigAction};
use crate::paths::AppPaths;
use crate::settings::{apply_overrides, load_config, renderer_config};

/// How often the host wakes up when no window input arrives.
const SIGNAL_POLL: Duration = Duration::from_millis(250);

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let config_path = match cli.run.config.clone() {
        Some(path) => path,
        None => AppPaths::discover()?.config_file(),
    };

    match cli.command {
        Some(Command::Config(command)) => match command.action {
            ConfigAction::Where => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigAction::Show => {
                let mut config = load_config(&config_path)?;
                apply_overrides(&mut config, &cli.run)?;
                let rendered = config
                    .to_toml_string()
                    .context("failed to serialise configuration")?;
                print!("{rendered}");
                Ok(())
            }
        },
        Some(Command::Shaders) => check_shaders(),
        None => run_viewer(config_path, &cli),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Log to stderr so `config show` output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn check_shaders() -> Result<()> {
    let count = validate_builtin_programs().context("built-in shader program is invalid")?;
    for program in ALL_PROGRAMS {
        println!("ok  {:?}  {}", program.stage, program.label);
    }
    println!("{count} shader programs validated");
    Ok(())
}

fn run_viewer(config_path: PathBuf, cli: &Cli) -> Result<()> {
    let mut config = load_config(&config_path)?;
    apply_overrides(&mut config, &cli.run)?;
    let renderer_config = renderer_config(&config);
    let parameters = renderer_config.parameters.clone();

    tracing::info!(
        config = %config_path.display(),
        mass = config.simulation.mass,
        show_disk = config.simulation.show_disk,
        "starting chronolens"
    );
    tracing::info!("controls: drag to orbit, scroll to zoom, Up/Down mass (Shift x10), D disk, R reset, Esc quit");

    let frame_loop = FrameLoop::start(renderer_config).context("failed to start renderer")?;

    loop {
        let Some(signal) = frame_loop.recv_signal_timeout(SIGNAL_POLL) else {
            continue;
        };
        if !handle_signal(signal, &parameters, &frame_loop) {
            break;
        }
    }

    frame_loop.stop()
}

/// Applies one window signal. Returns `false` once the window has closed.
fn handle_signal(signal: WindowSignal, parameters: &SharedParameters, frame_loop: &FrameLoop) -> bool {
    match signal {
        WindowSignal::AdjustMass(delta) => {
            let updated = parameters.update(|current| current.with_mass_step(delta));
            tracing::info!(mass = updated.mass, "mass changed");
        }
        WindowSignal::ToggleDisk => {
            let updated = parameters.update(SimulationParameters::with_disk_toggled);
            tracing::info!(show_disk = updated.show_disk, "disk toggled");
        }
        WindowSignal::Reset => {
            parameters.store(SimulationParameters::default());
            if let Err(err) = frame_loop.reset_camera() {
                tracing::warn!(error = %err, "failed to reset camera");
            }
            tracing::info!("parameters and camera reset");
        }
        WindowSignal::Closed => return false,
    }
    true
}

//! Landscape runner
//!
//! Loads a world file, builds the terrain tree it describes, runs the
//! configured timesteps and queries, and prints a JSON report to stdout.

mod cli;
mod config;
mod world;

use cli::CliArgs;
use config::{AppConfig, CheckpointSettings, LoggingSettings};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize logging system
fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the report, so logs go to stderr
    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

// ============================================================================
// Entry Point
// ============================================================================

/// Applies command-line overrides on top of the world file
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(timesteps) = args.timesteps {
        config.world.timesteps = timesteps;
    }
    if let Some(path) = &args.checkpoint {
        let compressed = config.checkpoint.as_ref().map_or(true, |settings| settings.compressed);
        config.checkpoint = Some(CheckpointSettings {
            path: path.to_string_lossy().into_owned(),
            compressed,
        });
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path)?;
    apply_overrides(&mut config, &args);

    setup_logging(&config.logging, args.json_logs)?;
    display_banner();

    if let Err(e) = config.validate() {
        error!("❌ Invalid world file {}: {}", args.config_path.display(), e);
        return Err(e.into());
    }

    info!("📂 World file: {}", args.config_path.display());
    let report = world::run(&config)?;
    info!(
        "✅ Ran {} timesteps over {} cells with {} occupants",
        report.timesteps,
        report.cells,
        report.census.total()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║            🌿 LANDSCAPE 🌿               ║");
    info!("║          Terrain runner v{}           ║", version);
    info!("╚══════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> CliArgs {
        CliArgs {
            config_path: PathBuf::from("landscape.toml"),
            log_level: None,
            json_logs: false,
            timesteps: None,
            checkpoint: None,
        }
    }

    #[test]
    fn test_no_overrides_keep_world_file() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides_replace_settings() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            log_level: Some("trace".to_string()),
            timesteps: Some(3),
            checkpoint: Some(PathBuf::from("out.ckpt")),
            ..args()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.world.timesteps, 3);
        assert_eq!(
            config.checkpoint,
            Some(CheckpointSettings {
                path: "out.ckpt".to_string(),
                compressed: true,
            })
        );
    }

    #[test]
    fn test_checkpoint_override_keeps_encoding() {
        let mut config = AppConfig::default();
        config.checkpoint = Some(CheckpointSettings {
            path: "old.json".to_string(),
            compressed: false,
        });
        let args = CliArgs {
            checkpoint: Some(PathBuf::from("new.json")),
            ..args()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.checkpoint.map(|settings| settings.compressed), Some(false));
    }
}

//! Command-line interface for the landscape runner.
//!
//! Every option overrides the matching setting of the world file.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Path to the world file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the number of timesteps
    pub timesteps: Option<u32>,
    /// Optional override for the checkpoint output path
    pub checkpoint: Option<PathBuf>,
}

impl CliArgs {
    /// Parses the process arguments, exiting with a usage message on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("landscape.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            timesteps: matches.get_one::<u32>("timesteps").copied(),
            checkpoint: matches.get_one::<PathBuf>("checkpoint").cloned(),
        }
    }
}

fn command() -> Command {
    Command::new("Landscape")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a terrain tree from a world file, runs its timesteps and queries it")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("World file path")
                .value_parser(value_parser!(PathBuf))
                .default_value("landscape.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timesteps")
                .short('t')
                .long("timesteps")
                .value_name("COUNT")
                .help("Number of timesteps to run")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("checkpoint")
                .long("checkpoint")
                .value_name("FILE")
                .help("Write a checkpoint of the final tree to this file")
                .value_parser(value_parser!(PathBuf)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(&command().try_get_matches_from(args).unwrap())
    }

    #[test]
    fn test_defaults() {
        let args = parse_from(&["landscape"]);
        assert_eq!(args.config_path, PathBuf::from("landscape.toml"));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.timesteps, None);
        assert_eq!(args.checkpoint, None);
    }

    #[test]
    fn test_overrides() {
        let args = parse_from(&[
            "landscape",
            "-c",
            "meadow.toml",
            "-l",
            "debug",
            "--json-logs",
            "-t",
            "25",
            "--checkpoint",
            "meadow.ckpt",
        ]);
        assert_eq!(args.config_path, PathBuf::from("meadow.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.timesteps, Some(25));
        assert_eq!(args.checkpoint, Some(PathBuf::from("meadow.ckpt")));
    }

    #[test]
    fn test_invalid_timesteps() {
        assert!(command().try_get_matches_from(["landscape", "-t", "many"]).is_err());
    }
}

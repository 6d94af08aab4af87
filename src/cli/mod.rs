//! CLI module for tailtrim
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// tailtrim
///
/// Removes the last three seconds of a video without re-encoding.
#[derive(Parser, Debug)]
#[command(name = "tailtrim")]
#[command(about = "tailtrim - Cut the trailing three seconds off a video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./tailtrim.toml, then the per-user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trim the trailing three seconds off a video and save the result
    Trim(args::TrimArgs),
    /// Print the duration of a video and the trim limit it would get
    Probe(args::ProbeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_trim() {
        let cli = Cli::parse_from([
            "tailtrim",
            "--log-level",
            "debug",
            "trim",
            "--input",
            "clip.mp4",
            "--output-dir",
            "out",
            "--json",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Trim(args) => {
                assert_eq!(args.input, PathBuf::from("clip.mp4"));
                assert_eq!(args.output_dir, Some(PathBuf::from("out")));
                assert!(args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flag_after_subcommand() {
        let cli = Cli::parse_from(["tailtrim", "probe", "-i", "a.webm", "--config", "c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Commands::Probe(_)));
    }
}

//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory the trimmed video is saved to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Emit progress and the result as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

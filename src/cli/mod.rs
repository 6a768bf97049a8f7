//! CLI module for segcut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// segcut - Segment-based video cutter
///
/// Define named time ranges over a video, preview them in isolation and
/// export each one through ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "segcut")]
#[command(about = "segcut - Cut named segments out of a video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: segcut.toml, then config/segcut.toml)
    #[arg(long, global = true, env = "SEGCUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format: pretty, compact, json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// ffmpeg binary
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe binary
    #[arg(long, global = true)]
    pub ffprobe: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show duration and stream information of a video file
    Inspect(args::InspectArgs),
    /// Export one or more segments as separate files
    Cut(args::CutArgs),
    /// Play one segment on a simulated clock, looping at its end
    Preview(args::PreviewArgs),
}

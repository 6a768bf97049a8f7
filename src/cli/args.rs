//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::domain::errors::DomainError;
use crate::domain::model::{Segment, TimeSpec};

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long = "in")]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Input video file path
    #[arg(short, long = "in")]
    pub input: PathBuf,

    /// Segment as START-END[=NAME]; repeat for a batch. Times accept
    /// seconds, MM:SS.ms or HH:MM:SS.ms
    #[arg(short, long = "segment", required = true)]
    pub segments: Vec<String>,

    /// Output resolution: original, 1920x1080, 1280x720, 854x480, 640x360 or WxH
    #[arg(long)]
    pub resolution: Option<String>,

    /// Video bitrate: original, 8000k, 4000k, 2000k, 1000k or any <n>k / <n>M
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Print the job report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input video file path
    #[arg(short, long = "in")]
    pub input: PathBuf,

    /// Segment to preview as START-END[=NAME]
    #[arg(short, long)]
    pub segment: String,

    /// Playback speed multiplier for the simulated clock
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Stop after the segment end has been reached this many times
    #[arg(long, default_value_t = 1)]
    pub loops: u32,
}

/// A segment given on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentArg {
    pub start: f64,
    pub end: f64,
    pub name: Option<String>,
}

impl SegmentArg {
    /// Parse `START-END[=NAME]`
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let (range, name) = match value.split_once('=') {
            Some((range, name)) => (range, Some(name.trim().to_string())),
            None => (value, None),
        };
        let (start, end) = range.split_once('-').ok_or_else(|| {
            DomainError::BadArgs(format!(
                "Invalid segment '{}'. Expected START-END[=NAME], e.g. 0:10-0:20=Intro",
                value
            ))
        })?;

        let start = TimeSpec::parse(start)?.as_seconds();
        let end = TimeSpec::parse(end)?.as_seconds();
        Segment::validate_range(start, end)?;

        Ok(Self {
            start,
            end,
            name: name.filter(|n| !n.is_empty()),
        })
    }
}

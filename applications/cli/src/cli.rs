/// Command-line surface
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rgscan", version)]
#[command(about = "ReplayGain 2.0 loudness scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log per-file progress
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan an explicit list of files as one album
    Custom(CustomArgs),
    /// Scan a library, one album per directory
    Easy(EasyArgs),
}

#[derive(Debug, Args)]
pub struct CustomArgs {
    /// Files to scan
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub options: ScanOptions,
}

#[derive(Debug, Args)]
pub struct EasyArgs {
    /// Library root
    pub directory: PathBuf,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Only scan the root directory itself
    #[arg(long)]
    pub no_recursive: bool,

    #[command(flatten)]
    pub options: ScanOptions,
}

/// Options shared by both modes; unset values fall back to the preset and environment
#[derive(Debug, Default, Args)]
pub struct ScanOptions {
    /// Calculate album gain and peak
    #[arg(short, long)]
    pub album: bool,

    /// Use true peak instead of sample peak
    #[arg(short = 't', long)]
    pub true_peak: bool,

    /// Tag mode: i (write), d (delete), s (skip)
    #[arg(short = 's', long = "tagmode", value_name = "MODE")]
    pub tag_mode: Option<String>,

    /// Target loudness in LUFS (-30 to -5)
    #[arg(short = 'l', long, value_name = "LUFS", allow_hyphen_values = true)]
    pub loudness: Option<String>,

    /// Clip mode: n (disabled), t (track), a (track and album)
    #[arg(short = 'c', long, value_name = "MODE")]
    pub clip_mode: Option<String>,

    /// Maximum peak level in dB (negative)
    #[arg(short = 'm', long, value_name = "DB", allow_hyphen_values = true)]
    pub max_peak: Option<String>,

    /// Tab-separated output
    #[arg(short = 'O', long)]
    pub output: bool,

    /// Lowercase tag keys (MP4, Vorbis and APE)
    #[arg(short = 'L', long)]
    pub lowercase: bool,

    /// Strip ID3v1 and APE tags from MPEG files
    #[arg(short = 'S', long)]
    pub strip: bool,

    /// ID3v2 version for MPEG, WAV and AIFF files (3 or 4)
    #[arg(short = 'I', long = "id3v2-version", value_name = "VERSION")]
    pub id3v2_version: Option<String>,

    /// TOML preset file
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,
}

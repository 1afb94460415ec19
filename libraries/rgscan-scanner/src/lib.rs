//! Scan jobs for rgscan
//!
//! This crate turns files into measurements and measurements into tags:
//! - [`Config`]: validated, immutable scan settings
//! - [`ScanJob`] / [`Track`]: decode, measure and derive track and album gains
//! - [`ScanData`]: statistics over every finished job
//! - [`JobRunner`]: multithreaded execution with a shared decode lock
//!
//! Decoding and tagging sit behind the [`DecodeBackend`] and [`TagWriter`]
//! traits, implemented here with symphonia and lofty.
//!
//! # Example
//!
//! ```ignore
//! use rgscan_scanner::{Config, JobRunner, LoftyTagWriter, ScanData, ScanJob};
//! use std::sync::{Arc, Mutex};
//!
//! let config = Arc::new(Config::builder().album(true).build());
//! let jobs: Vec<_> = ScanJob::from_directory(dir, config).into_iter().collect();
//!
//! let data = Mutex::new(ScanData::new());
//! let jobs = JobRunner::new(4).run(jobs, &LoftyTagWriter::new(), &data);
//! ```

#![deny(unsafe_code)]

pub mod config;
mod data;
pub mod decode;
mod error;
mod file_type;
mod job;
mod runner;
pub mod tags;
mod track;

pub use config::{Config, ConfigBuilder, ConfigError, Id3v2Version, TagMode};
pub use data::ScanData;
pub use decode::{DecodeBackend, DecodeLock, PcmStream, StreamInfo, SymphoniaBackend};
pub use error::{Result, ScanError};
pub use file_type::{FileType, TagScheme};
pub use job::{discover_directories, JobState, ScanJob};
pub use runner::JobRunner;
pub use tags::{LoftyTagWriter, TagOptions, TagRequest, TagWriter};
pub use track::{ScanResult, Track, TrackState};

pub use rgscan_loudness::{ClipMode, PeakMode};

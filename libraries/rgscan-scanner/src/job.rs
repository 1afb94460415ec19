//! Scan jobs: one album unit of tracks
//!
//! ```text
//! Created ──scan()──► Scanning ──► Scanned ──tag_tracks()──► Tagged
//!                         │
//!                         └──────► Failed
//! ```

use crate::config::{Config, TagMode};
use crate::data::ScanData;
use crate::decode::{DecodeBackend, DecodeLock};
use crate::file_type::FileType;
use crate::tags::{TagOptions, TagRequest, TagWriter};
use crate::track::{ScanResult, Track};
use rgscan_loudness::{ClipScope, LoudnessAnalyzer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Lifecycle of a [`ScanJob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Scanning,
    Scanned,
    Failed,
    Tagged,
}

/// A group of tracks scanned together and sharing an album result
#[derive(Debug)]
pub struct ScanJob {
    path: PathBuf,
    tracks: Vec<Track>,
    nb_files: usize,
    config: Arc<Config>,
    state: JobState,
    error: bool,
    clipping_adjustments: usize,
    skipped: usize,
    album_result: Option<ScanResult>,
    tag_failures: Vec<(PathBuf, String)>,
}

impl ScanJob {
    fn new(path: PathBuf, tracks: Vec<Track>, config: Arc<Config>) -> Self {
        Self {
            nb_files: tracks.len(),
            path,
            tracks,
            config,
            state: JobState::Created,
            error: false,
            clipping_adjustments: 0,
            skipped: 0,
            album_result: None,
            tag_failures: Vec::new(),
        }
    }

    /// Build one job from an explicit list of files
    ///
    /// Missing files are dropped with a warning. Files with an unknown
    /// extension are kept and left to content detection. Returns `None`
    /// when nothing is left to scan.
    pub fn from_files<I, P>(files: I, config: Arc<Config>) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut tracks = Vec::new();

        for file in files {
            let path = file.as_ref();
            if !path.is_file() {
                warn!("File '{}' does not exist", path.display());
                continue;
            }

            let file_type = match FileType::from_path(path) {
                FileType::Invalid => FileType::Default,
                known => known,
            };
            tracks.push(Track::new(path, file_type));
        }

        if tracks.is_empty() {
            return None;
        }

        let path = common_parent(&tracks);
        Some(Self::new(path, tracks, config))
    }

    /// Build one job from the supported files directly inside `dir`
    ///
    /// Files are taken in name order; unsupported extensions are skipped.
    pub fn from_directory(dir: &Path, config: Arc<Config>) -> Option<Self> {
        let tracks: Vec<Track> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let file_type = FileType::from_path(e.path());
                file_type
                    .is_supported()
                    .then(|| Track::new(e.into_path(), file_type))
            })
            .collect();

        if tracks.is_empty() {
            debug!("No supported files in {}", dir.display());
            return None;
        }

        Some(Self::new(dir.to_path_buf(), tracks, config))
    }

    /// Scan every track, then derive the album result
    ///
    /// Returns `false` when no track could be measured.
    pub fn scan(&mut self, backend: &dyn DecodeBackend, lock: Option<&DecodeLock>) -> bool {
        if self.state != JobState::Created {
            warn!("Job {} was already scanned", self.path.display());
            return !self.error;
        }

        self.state = JobState::Scanning;
        info!("Scanning {} ({} files)", self.path.display(), self.nb_files);

        let config = Arc::clone(&self.config);
        for track in &mut self.tracks {
            let outcome = track
                .scan(&config, backend, lock)
                .and_then(|()| track.calculate_loudness(&config));

            if let Err(e) = outcome {
                warn!("Skipping {}: {}", track.path().display(), e);
                self.skipped += 1;
            }
        }

        if self.tracks.iter().all(|t| !t.is_success()) {
            warn!("No track of {} could be measured", self.path.display());
            self.error = true;
            self.state = JobState::Failed;
            return false;
        }

        if self.config.do_album() {
            self.calculate_album_loudness();
        }

        for track in &mut self.tracks {
            track.release_analyzer();
        }

        self.clipping_adjustments = self
            .tracks
            .iter()
            .filter(|t| t.is_success() && (t.tclip() || t.aclip()))
            .count();

        self.state = JobState::Scanned;
        true
    }

    /// Combine every measured track into one album measurement
    ///
    /// Needs at least two measured tracks. When the album gain is lowered
    /// to avoid clipping, every contributing track is flagged `aclip`.
    fn calculate_album_loudness(&mut self) {
        let analyzers: Vec<&LoudnessAnalyzer> = self
            .tracks
            .iter()
            .filter(|t| t.is_success())
            .filter_map(Track::analyzer)
            .collect();

        if analyzers.len() < 2 {
            debug!(
                "Album mode needs at least two measured tracks, {} has {}",
                self.path.display(),
                analyzers.len()
            );
            return;
        }

        let peak_mode = self.config.peak_mode();
        let measured = LoudnessAnalyzer::combine(analyzers).and_then(|album| {
            Ok((album.integrated_loudness()?, album.peak(peak_mode)?))
        });

        let (loudness, peak) = match measured {
            Ok(measured) => measured,
            Err(e) => {
                warn!("Album loudness of {} unavailable: {}", self.path.display(), e);
                return;
            }
        };

        let (result, aclip) = ScanResult::derive(
            loudness,
            peak,
            self.config.target_loudness(),
            &self.config.clipping_guard(),
            ClipScope::Album,
        );

        for track in self.tracks.iter_mut().filter(|t| t.is_success()) {
            track.set_album_result(result, aclip);
        }
        self.album_result = Some(result);
    }

    /// Apply the configured tag mode to every measured track
    ///
    /// Tag failures are recorded on the track and the job; measurements are
    /// left untouched.
    pub fn tag_tracks(&mut self, writer: &dyn TagWriter) {
        if self.state != JobState::Scanned {
            return;
        }

        let mode = self.config.tag_mode();
        let options = TagOptions::from_config(&self.config);
        let album = self.album_result;

        for track in self.tracks.iter_mut().filter(|t| t.is_success()) {
            let outcome = match (mode, track.result()) {
                (TagMode::Skip, _) | (_, None) => continue,
                (TagMode::Write, Some(result)) => writer.write_tags(&TagRequest {
                    path: track.path(),
                    file_type: track.file_type(),
                    track: result,
                    album: album.as_ref(),
                    options,
                }),
                (TagMode::Delete, Some(_)) => {
                    writer.delete_tags(track.file_type(), track.path(), &options)
                }
            };

            match outcome {
                Ok(()) => track.set_tag_error(None),
                Err(e) => {
                    warn!("Couldn't write tags for {}: {}", track.path().display(), e);
                    let message = e.to_string();
                    self.tag_failures
                        .push((track.path().to_path_buf(), message.clone()));
                    track.set_tag_error(Some(message));
                }
            }
        }

        self.state = JobState::Tagged;
    }

    /// Fold this job into the shared statistics
    pub fn update_data(&self, data: &Mutex<ScanData>) {
        data.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fold(self);
    }

    /// Directory (or common parent of the input files) of this job
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of files the job was created with
    pub fn nb_files(&self) -> usize {
        self.nb_files
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// No track could be measured
    pub fn error(&self) -> bool {
        self.error
    }

    pub fn clipping_adjustments(&self) -> usize {
        self.clipping_adjustments
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn album_result(&self) -> Option<&ScanResult> {
        self.album_result.as_ref()
    }

    /// Files whose tags could not be written or removed
    pub fn tag_failures(&self) -> &[(PathBuf, String)] {
        &self.tag_failures
    }
}

/// Deepest directory shared by every track
fn common_parent(tracks: &[Track]) -> PathBuf {
    let mut parents = tracks
        .iter()
        .map(|t| t.path().parent().unwrap_or_else(|| Path::new("")));

    let Some(first) = parents.next() else {
        return PathBuf::new();
    };

    parents.fold(first.to_path_buf(), |common, parent| {
        common
            .ancestors()
            .find(|a| parent.starts_with(a))
            .map(Path::to_path_buf)
            .unwrap_or_default()
    })
}

/// Directories under `root` that directly contain supported files
///
/// Without `recursive` only `root` itself is considered. The result is
/// sorted and each directory becomes one job.
pub fn discover_directories(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let directories: BTreeSet<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && FileType::from_path(e.path()).is_supported())
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect();

    directories.into_iter().collect()
}

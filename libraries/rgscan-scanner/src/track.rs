//! A single input file and its measurement
//!
//! ```text
//! Created ──scan()──► Decoding ──► Measured ──calculate_loudness()──► Measured + result
//!                         │                          │
//!                         └────────► Failed ◄────────┘
//! ```

use crate::config::Config;
use crate::decode::{DecodeBackend, DecodeLock};
use crate::error::{Result, ScanError};
use crate::file_type::FileType;
use rgscan_loudness::{ClipScope, ClippingGuard, LoudnessAnalyzer};
use std::path::{Path, PathBuf};

/// Gain, peak and loudness of a track or an album
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    /// Gain to apply at playback (dB)
    pub gain_db: f64,
    /// Linear peak (sample or true peak per configuration)
    pub peak: f64,
    /// Integrated loudness (LUFS)
    pub loudness_lufs: f64,
}

impl ScanResult {
    /// Derive a result from a measurement
    ///
    /// `gain = target - loudness`, then capped by the guard for `scope`.
    /// The flag reports whether the guard lowered the gain.
    pub fn derive(
        loudness_lufs: f64,
        peak: f64,
        target_loudness: f64,
        guard: &ClippingGuard,
        scope: ClipScope,
    ) -> (Self, bool) {
        let gain_db = target_loudness - loudness_lufs;
        let decision = guard.check(gain_db, peak, scope);

        (
            Self {
                gain_db: decision.resolve(gain_db),
                peak,
                loudness_lufs,
            },
            decision.is_adjusted(),
        )
    }
}

/// Lifecycle of a [`Track`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Created,
    Decoding,
    Measured,
    Failed,
}

impl TrackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Decoding => "decoding",
            Self::Measured => "measured",
            Self::Failed => "failed",
        }
    }
}

/// One input file of a scan job
#[derive(Debug)]
pub struct Track {
    path: PathBuf,
    file_type: FileType,
    analyzer: Option<LoudnessAnalyzer>,
    container: String,
    codec: String,
    result: Option<ScanResult>,
    album_result: Option<ScanResult>,
    tclip: bool,
    aclip: bool,
    state: TrackState,
    error: Option<String>,
    tag_error: Option<String>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            file_type,
            analyzer: None,
            container: String::new(),
            codec: String::new(),
            result: None,
            album_result: None,
            tclip: false,
            aclip: false,
            state: TrackState::Created,
            error: None,
            tag_error: None,
        }
    }

    /// Decode the file and feed every block to a fresh analyzer
    ///
    /// An `Err` leaves the track in [`TrackState::Failed`]; the owning job
    /// counts it as skipped and carries on.
    pub fn scan(
        &mut self,
        config: &Config,
        backend: &dyn DecodeBackend,
        lock: Option<&DecodeLock>,
    ) -> Result<()> {
        if self.state != TrackState::Created {
            return Err(ScanError::InvalidState {
                expected: TrackState::Created.as_str(),
                found: self.state.as_str(),
            });
        }

        self.state = TrackState::Decoding;
        match self.decode(config, backend, lock) {
            Ok(analyzer) => {
                tracing::debug!(
                    "Decoded {} frames from {}",
                    analyzer.frames_processed(),
                    self.path.display()
                );
                self.analyzer = Some(analyzer);
                self.state = TrackState::Measured;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn decode(
        &mut self,
        config: &Config,
        backend: &dyn DecodeBackend,
        lock: Option<&DecodeLock>,
    ) -> Result<LoudnessAnalyzer> {
        let mut stream = backend.open(&self.path, self.file_type, lock)?;

        let info = stream.info().clone();
        if matches!(self.file_type, FileType::Default | FileType::Invalid) {
            self.file_type = info.file_type;
        }
        self.container = info.container;
        self.codec = info.codec;

        let mut analyzer =
            LoudnessAnalyzer::new(info.channels, info.sample_rate, config.peak_mode())?;

        while let Some(block) = stream.next_block()? {
            analyzer.add_frames(block)?;
        }

        if analyzer.frames_processed() == 0 {
            return Err(ScanError::NoFrames(self.path.clone()));
        }

        Ok(analyzer)
    }

    /// Derive the track result from the measurement
    ///
    /// Only valid once measured. Calling it again keeps the first result.
    pub fn calculate_loudness(&mut self, config: &Config) -> Result<()> {
        if self.state != TrackState::Measured {
            return Err(ScanError::InvalidState {
                expected: TrackState::Measured.as_str(),
                found: self.state.as_str(),
            });
        }
        if self.result.is_some() {
            return Ok(());
        }

        let measured = self.analyzer.as_ref().map_or(
            Err(ScanError::InvalidState {
                expected: "analyzer",
                found: "none",
            }),
            |analyzer| {
                let loudness = analyzer.integrated_loudness()?;
                let peak = analyzer.peak(config.peak_mode())?;
                Ok((loudness, peak))
            },
        );

        match measured {
            Ok((loudness, peak)) => {
                let (result, clipped) = ScanResult::derive(
                    loudness,
                    peak,
                    config.target_loudness(),
                    &config.clipping_guard(),
                    ClipScope::Track,
                );
                if clipped {
                    tracing::debug!(
                        "Track gain of {} lowered to {:.2} dB to avoid clipping",
                        self.path.display(),
                        result.gain_db
                    );
                }
                self.tclip = clipped;
                self.result = Some(result);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: ScanError) -> ScanError {
        self.state = TrackState::Failed;
        self.analyzer = None;
        self.error = Some(error.to_string());
        error
    }

    pub(crate) fn set_album_result(&mut self, result: ScanResult, aclip: bool) {
        self.album_result = Some(result);
        self.aclip = aclip;
    }

    pub(crate) fn set_tag_error(&mut self, error: Option<String>) {
        self.tag_error = error;
    }

    /// Drop the analyzer once nothing needs it anymore
    pub(crate) fn release_analyzer(&mut self) {
        self.analyzer = None;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Analyzer of a measured track (released after the job finishes scanning)
    pub fn analyzer(&self) -> Option<&LoudnessAnalyzer> {
        self.analyzer.as_ref()
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    pub fn album_result(&self) -> Option<&ScanResult> {
        self.album_result.as_ref()
    }

    /// Track gain was lowered to avoid clipping
    pub fn tclip(&self) -> bool {
        self.tclip
    }

    /// Album gain was lowered to avoid clipping
    pub fn aclip(&self) -> bool {
        self.aclip
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Reason the track failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reason writing or deleting tags failed
    pub fn tag_error(&self) -> Option<&str> {
        self.tag_error.as_deref()
    }

    /// Measured and a result is available
    pub fn is_success(&self) -> bool {
        self.state == TrackState::Measured && self.result.is_some()
    }
}

//! Scan configuration
//!
//! A [`Config`] can only be produced by [`ConfigBuilder`], whose setters run
//! the same validation as the `parse_*` functions used for textual input.
//! Once built it is shared read-only by every job (usually as `Arc<Config>`).

use rgscan_loudness::{
    ClipMode, ClippingGuard, PeakMode, EBU_R128_MAX_PEAK_DB, MAX_TARGET_LOUDNESS,
    MIN_TARGET_LOUDNESS, REPLAYGAIN_REFERENCE_LUFS,
};
use std::fmt;
use thiserror::Error;

/// Rejected configuration value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid target loudness '{0}': must be a number between -30 and -5 LUFS")]
    TargetLoudness(String),

    #[error("Invalid max peak level '{0}': must be a negative dB value")]
    MaxPeakLevel(String),

    #[error("Invalid tag mode '{0}': expected one of i (write), d (delete), s (skip)")]
    TagMode(String),

    #[error("Invalid clip mode '{0}': expected one of n (disabled), t (track), a (track and album)")]
    ClipMode(String),

    #[error("Invalid ID3v2 version '{0}': only 3 and 4 are supported")]
    Id3v2Version(String),
}

/// What happens to tags once a job is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMode {
    /// Write gain and peak tags
    #[default]
    Write,
    /// Remove gain and peak tags
    Delete,
    /// Scan only, leave files untouched
    Skip,
}

impl TagMode {
    /// Single-character code used on the command line
    pub fn code(self) -> char {
        match self {
            Self::Write => 'i',
            Self::Delete => 'd',
            Self::Skip => 's',
        }
    }
}

/// ID3v2 revision used when writing MPEG/WAV/AIFF tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Id3v2Version {
    V3,
    #[default]
    V4,
}

impl Id3v2Version {
    pub fn major(self) -> u8 {
        match self {
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }
}

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

/// Parse and validate a target loudness in LUFS ([-30, -5])
pub fn parse_target_loudness(value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| valid_target_loudness(*v))
        .ok_or_else(|| ConfigError::TargetLoudness(value.to_string()))
}

/// Parse and validate a maximum peak level in dB (strictly negative)
pub fn parse_max_peak_level(value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| valid_max_peak_level(*v))
        .ok_or_else(|| ConfigError::MaxPeakLevel(value.to_string()))
}

/// Parse a tag mode code (`i`, `d`, `s`)
pub fn parse_tag_mode(value: &str) -> Result<TagMode, ConfigError> {
    match single_char(value) {
        Some('i') => Ok(TagMode::Write),
        Some('d') => Ok(TagMode::Delete),
        Some('s') => Ok(TagMode::Skip),
        _ => Err(ConfigError::TagMode(value.to_string())),
    }
}

/// Parse a clip mode code (`n`, `t`, `a`)
pub fn parse_clip_mode(value: &str) -> Result<ClipMode, ConfigError> {
    match single_char(value) {
        Some('n') => Ok(ClipMode::Disabled),
        Some('t') => Ok(ClipMode::Track),
        Some('a') => Ok(ClipMode::TrackAndAlbum),
        _ => Err(ConfigError::ClipMode(value.to_string())),
    }
}

/// Single-character code for a clip mode
pub fn clip_mode_code(mode: ClipMode) -> char {
    match mode {
        ClipMode::Disabled => 'n',
        ClipMode::Track => 't',
        ClipMode::TrackAndAlbum => 'a',
    }
}

/// Parse an ID3v2 major version (3 or 4)
pub fn parse_id3v2_version(value: &str) -> Result<Id3v2Version, ConfigError> {
    match value.trim() {
        "3" => Ok(Id3v2Version::V3),
        "4" => Ok(Id3v2Version::V4),
        _ => Err(ConfigError::Id3v2Version(value.to_string())),
    }
}

fn valid_target_loudness(value: f64) -> bool {
    (MIN_TARGET_LOUDNESS..=MAX_TARGET_LOUDNESS).contains(&value)
}

fn valid_max_peak_level(value: f64) -> bool {
    value.is_finite() && value < 0.0
}

/// Immutable scan configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    tag_mode: TagMode,
    target_loudness: f64,
    max_peak_level: f64,
    true_peak: bool,
    clip_mode: ClipMode,
    do_album: bool,
    tab_output: bool,
    lowercase: bool,
    strip: bool,
    id3v2_version: Id3v2Version,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_mode: TagMode::Write,
            target_loudness: REPLAYGAIN_REFERENCE_LUFS,
            max_peak_level: EBU_R128_MAX_PEAK_DB,
            true_peak: false,
            clip_mode: ClipMode::Disabled,
            do_album: false,
            tab_output: false,
            lowercase: false,
            strip: false,
            id3v2_version: Id3v2Version::V4,
        }
    }
}

impl Config {
    /// Start from the defaults (-18 LUFS, -1 dB ceiling, no clip protection)
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn tag_mode(&self) -> TagMode {
        self.tag_mode
    }

    /// Target loudness in LUFS
    pub fn target_loudness(&self) -> f64 {
        self.target_loudness
    }

    /// Peak ceiling in dB
    pub fn max_peak_level(&self) -> f64 {
        self.max_peak_level
    }

    /// Report true peaks instead of sample peaks
    pub fn true_peak(&self) -> bool {
        self.true_peak
    }

    pub fn peak_mode(&self) -> PeakMode {
        if self.true_peak {
            PeakMode::True
        } else {
            PeakMode::Sample
        }
    }

    pub fn clip_mode(&self) -> ClipMode {
        self.clip_mode
    }

    /// Guard configured with this clip mode and ceiling
    pub fn clipping_guard(&self) -> ClippingGuard {
        ClippingGuard::new(self.clip_mode, self.max_peak_level)
    }

    pub fn do_album(&self) -> bool {
        self.do_album
    }

    pub fn tab_output(&self) -> bool {
        self.tab_output
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    pub fn strip(&self) -> bool {
        self.strip
    }

    pub fn id3v2_version(&self) -> Id3v2Version {
        self.id3v2_version
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {:.2} LUFS, max peak {:.2} dB, {} peak, clip mode '{}', album {}, tag mode '{}'",
            self.target_loudness,
            self.max_peak_level,
            if self.true_peak { "true" } else { "sample" },
            clip_mode_code(self.clip_mode),
            if self.do_album { "on" } else { "off" },
            self.tag_mode.code()
        )
    }
}

/// Builder that validates every numeric field before a [`Config`] exists
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn tag_mode(mut self, mode: TagMode) -> Self {
        self.config.tag_mode = mode;
        self
    }

    /// Set the target loudness; rejected outside [-30, -5] LUFS
    pub fn target_loudness(mut self, lufs: f64) -> Result<Self, ConfigError> {
        if !valid_target_loudness(lufs) {
            return Err(ConfigError::TargetLoudness(lufs.to_string()));
        }
        self.config.target_loudness = lufs;
        Ok(self)
    }

    /// Set the peak ceiling; rejected unless strictly negative
    pub fn max_peak_level(mut self, db: f64) -> Result<Self, ConfigError> {
        if !valid_max_peak_level(db) {
            return Err(ConfigError::MaxPeakLevel(db.to_string()));
        }
        self.config.max_peak_level = db;
        Ok(self)
    }

    pub fn true_peak(mut self, enabled: bool) -> Self {
        self.config.true_peak = enabled;
        self
    }

    pub fn clip_mode(mut self, mode: ClipMode) -> Self {
        self.config.clip_mode = mode;
        self
    }

    pub fn album(mut self, enabled: bool) -> Self {
        self.config.do_album = enabled;
        self
    }

    pub fn tab_output(mut self, enabled: bool) -> Self {
        self.config.tab_output = enabled;
        self
    }

    pub fn lowercase(mut self, enabled: bool) -> Self {
        self.config.lowercase = enabled;
        self
    }

    pub fn strip(mut self, enabled: bool) -> Self {
        self.config.strip = enabled;
        self
    }

    pub fn id3v2_version(mut self, version: Id3v2Version) -> Self {
        self.config.id3v2_version = version;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

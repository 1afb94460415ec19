//! ReplayGain tag writing
//!
//! Values are written according to the [`TagScheme`] of the file type:
//! - ID3v2 (MP2, MP3, WAV, AIFF): TXXX frames with "REPLAYGAIN_*" descriptions
//! - Vorbis Comments (FLAC, Ogg): REPLAYGAIN_* fields
//! - Opus: R128_TRACK_GAIN / R128_ALBUM_GAIN as Q7.8 integers relative to -23 LUFS
//! - APE tags (WavPack, Monkey's Audio, Musepack): REPLAYGAIN_* items
//! - MP4/AAC: iTunes-style ----:com.apple.iTunes:* atoms

use crate::config::{Config, Id3v2Version};
use crate::error::{Result, ScanError};
use crate::file_type::{FileType, TagScheme};
use crate::track::ScanResult;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagExt, TagType};
use rgscan_loudness::EBU_R128_BROADCAST_LUFS;
use std::path::Path;
use tracing::debug;

const TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
const TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";
const ALBUM_GAIN: &str = "REPLAYGAIN_ALBUM_GAIN";
const ALBUM_PEAK: &str = "REPLAYGAIN_ALBUM_PEAK";
const R128_TRACK_GAIN: &str = "R128_TRACK_GAIN";
const R128_ALBUM_GAIN: &str = "R128_ALBUM_GAIN";
const ITUNES_PREFIX: &str = "----:com.apple.iTunes:";

/// Tagging options shared by every file of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagOptions {
    /// Loudness the gains were computed against
    pub target_loudness: f64,
    /// Lowercase free-form keys (MP4 atoms, Vorbis/APE fields)
    pub lowercase: bool,
    /// Remove ID3v1 and APE tags from MPEG files
    pub strip: bool,
    pub id3v2_version: Id3v2Version,
}

impl TagOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_loudness: config.target_loudness(),
            lowercase: config.lowercase(),
            strip: config.strip(),
            id3v2_version: config.id3v2_version(),
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions::new().use_id3v23(self.id3v2_version == Id3v2Version::V3)
    }
}

impl Default for TagOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Values to write for one track
#[derive(Debug, Clone, Copy)]
pub struct TagRequest<'a> {
    pub path: &'a Path,
    pub file_type: FileType,
    pub track: &'a ScanResult,
    pub album: Option<&'a ScanResult>,
    pub options: TagOptions,
}

/// Tag-writing backend
pub trait TagWriter: Send + Sync {
    /// Write track (and album, if present) gain and peak
    fn write_tags(&self, request: &TagRequest<'_>) -> Result<()>;

    /// Remove every gain and peak value written by [`TagWriter::write_tags`]
    fn delete_tags(&self, file_type: FileType, path: &Path, options: &TagOptions) -> Result<()>;
}

/// [`TagWriter`] backed by lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }
}

/// Convert a gain in dB to the Q7.8 fixed-point value used by R128 tags
pub fn to_q78(gain_db: f64) -> i16 {
    (gain_db * 256.0)
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Rebase a gain computed against `target_loudness` onto -23 LUFS
pub fn r128_gain(gain_db: f64, target_loudness: f64) -> f64 {
    gain_db + (EBU_R128_BROADCAST_LUFS - target_loudness)
}

fn format_gain(gain_db: f64) -> String {
    format!("{:.2} dB", gain_db)
}

fn format_peak(peak: f64) -> String {
    format!("{:.6}", peak)
}

/// Key for a ReplayGain field under the given scheme
fn replaygain_key(scheme: TagScheme, name: &str, lowercase: bool) -> ItemKey {
    match (scheme, lowercase) {
        (TagScheme::Mp4, true) => {
            ItemKey::Unknown(format!("{ITUNES_PREFIX}{}", name.to_ascii_lowercase()))
        }
        (TagScheme::VorbisComment | TagScheme::Ape, true) => {
            ItemKey::Unknown(name.to_ascii_lowercase())
        }
        _ => match name {
            TRACK_GAIN => ItemKey::ReplayGainTrackGain,
            TRACK_PEAK => ItemKey::ReplayGainTrackPeak,
            ALBUM_GAIN => ItemKey::ReplayGainAlbumGain,
            ALBUM_PEAK => ItemKey::ReplayGainAlbumPeak,
            other => ItemKey::Unknown(other.to_string()),
        },
    }
}

/// Every key a previous run may have left behind
fn all_keys(scheme: TagScheme) -> Vec<ItemKey> {
    let mut keys = Vec::new();
    for name in [TRACK_GAIN, TRACK_PEAK, ALBUM_GAIN, ALBUM_PEAK] {
        keys.push(replaygain_key(scheme, name, false));
        keys.push(replaygain_key(scheme, name, true));
    }
    if scheme == TagScheme::OpusR128 {
        keys.push(ItemKey::Unknown(R128_TRACK_GAIN.to_string()));
        keys.push(ItemKey::Unknown(R128_ALBUM_GAIN.to_string()));
    }
    keys.dedup();
    keys
}

fn supported_scheme(file_type: FileType) -> Result<TagScheme> {
    match file_type.tag_scheme() {
        TagScheme::Unsupported => Err(ScanError::UnsupportedFormat(format!(
            "no tag writer for {file_type} files"
        ))),
        scheme => Ok(scheme),
    }
}

fn is_mpeg(file_type: FileType) -> bool {
    matches!(file_type, FileType::Mp2 | FileType::Mp3)
}

fn strip_legacy_tags(path: &Path) -> Result<()> {
    for tag_type in [TagType::Id3v1, TagType::Ape] {
        tag_type
            .remove_from_path(path)
            .map_err(|e| ScanError::TagWriteError(e.to_string()))?;
    }
    debug!("Stripped ID3v1/APE tags from {:?}", path);
    Ok(())
}

fn save(tag: &Tag, path: &Path, options: &TagOptions) -> Result<()> {
    tag.save_to_path(path, options.write_options())
        .map_err(|e| ScanError::TagWriteError(e.to_string()))
}

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, request: &TagRequest<'_>) -> Result<()> {
        let path = request.path;
        let options = &request.options;
        let scheme = supported_scheme(request.file_type)?;

        if !path.exists() {
            return Err(ScanError::FileNotFound(path.to_path_buf()));
        }

        if options.strip && is_mpeg(request.file_type) {
            strip_legacy_tags(path)?;
        }

        let mut tagged_file = Probe::open(path)?.read()?;

        // Get or create the primary tag
        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file.tag_mut(tag_type).ok_or_else(|| {
            ScanError::TagWriteError(format!("cannot create {tag_type:?} tag"))
        })?;

        // Old values may sit under the other key spelling
        for key in all_keys(scheme) {
            tag.remove_key(&key);
        }

        if scheme == TagScheme::OpusR128 {
            let track = to_q78(r128_gain(request.track.gain_db, options.target_loudness));
            tag.insert_text(ItemKey::Unknown(R128_TRACK_GAIN.to_string()), track.to_string());

            if let Some(album) = request.album {
                let album = to_q78(r128_gain(album.gain_db, options.target_loudness));
                tag.insert_text(ItemKey::Unknown(R128_ALBUM_GAIN.to_string()), album.to_string());
            }
        } else {
            let key = |name: &str| replaygain_key(scheme, name, options.lowercase);

            tag.insert_text(key(TRACK_GAIN), format_gain(request.track.gain_db));
            tag.insert_text(key(TRACK_PEAK), format_peak(request.track.peak));

            if let Some(album) = request.album {
                tag.insert_text(key(ALBUM_GAIN), format_gain(album.gain_db));
                tag.insert_text(key(ALBUM_PEAK), format_peak(album.peak));
            }
        }

        save(tag, path, options)?;

        debug!("Wrote ReplayGain tags to {:?}", path);

        Ok(())
    }

    fn delete_tags(&self, file_type: FileType, path: &Path, options: &TagOptions) -> Result<()> {
        let scheme = supported_scheme(file_type)?;

        if !path.exists() {
            return Err(ScanError::FileNotFound(path.to_path_buf()));
        }

        if options.strip && is_mpeg(file_type) {
            strip_legacy_tags(path)?;
        }

        let mut tagged_file = Probe::open(path)?.read()?;

        let tag_type = tagged_file.primary_tag_type();
        if let Some(tag) = tagged_file.tag_mut(tag_type) {
            for key in all_keys(scheme) {
                tag.remove_key(&key);
            }
            save(tag, path, options)?;
        }

        debug!("Removed ReplayGain tags from {:?}", path);

        Ok(())
    }
}

/// ReplayGain values found in a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayGainTags {
    pub track_gain: Option<f64>,
    pub track_peak: Option<f64>,
    pub album_gain: Option<f64>,
    pub album_peak: Option<f64>,
}

impl ReplayGainTags {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Parse a gain value from a string (e.g., "-5.23 dB" -> -5.23)
fn parse_gain(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix(" dB").unwrap_or(s);
    let s = s.strip_suffix("dB").unwrap_or(s);
    s.trim().parse().ok()
}

/// Read the ReplayGain values from the primary tag of a file
pub fn read_replaygain_tags<P: AsRef<Path>>(path: P) -> Result<ReplayGainTags> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScanError::FileNotFound(path.to_path_buf()));
    }

    let tagged_file = Probe::open(path)?.read()?;

    let mut tags = ReplayGainTags::default();
    if let Some(tag) = tagged_file.primary_tag() {
        let get = |key: ItemKey| tag.get_string(&key).and_then(parse_gain);
        tags.track_gain = get(ItemKey::ReplayGainTrackGain);
        tags.track_peak = get(ItemKey::ReplayGainTrackPeak);
        tags.album_gain = get(ItemKey::ReplayGainAlbumGain);
        tags.album_peak = get(ItemKey::ReplayGainAlbumPeak);
    }

    Ok(tags)
}

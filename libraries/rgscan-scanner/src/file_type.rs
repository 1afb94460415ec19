//! Supported file types and their tag schemes
//!
//! Classification is by extension only. [`FileType::Default`] marks a file
//! whose extension is unknown; the decoding backend resolves it from the
//! detected codec.

use std::fmt;
use std::path::Path;

/// How gain and peak values are stored for a file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScheme {
    /// ID3v2 frames (`TXXX:REPLAYGAIN_*`)
    Id3v2,
    /// Vorbis comments (`REPLAYGAIN_*`)
    VorbisComment,
    /// Vorbis comments with `R128_*` Q7.8 gains
    OpusR128,
    /// iTunes free-form atoms (`----:com.apple.iTunes:replaygain_*`)
    Mp4,
    /// APEv2 items
    Ape,
    /// No writer available
    Unsupported,
}

/// Closed set of recognised file types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Invalid,
    Default,
    Mp2,
    Mp3,
    Flac,
    Ogg,
    Opus,
    M4a,
    Wma,
    Wav,
    Aiff,
    WavPack,
    Ape,
    Tak,
    Mpc,
}

struct FileTypeInfo {
    file_type: FileType,
    name: &'static str,
    extensions: &'static [&'static str],
    tag_scheme: TagScheme,
}

/// Dispatch table, one row per variant
static FILE_TYPES: &[FileTypeInfo] = &[
    FileTypeInfo {
        file_type: FileType::Invalid,
        name: "Invalid",
        extensions: &[],
        tag_scheme: TagScheme::Unsupported,
    },
    FileTypeInfo {
        file_type: FileType::Default,
        name: "Unknown",
        extensions: &[],
        tag_scheme: TagScheme::Unsupported,
    },
    FileTypeInfo {
        file_type: FileType::Mp2,
        name: "MP2",
        extensions: &["mp2"],
        tag_scheme: TagScheme::Id3v2,
    },
    FileTypeInfo {
        file_type: FileType::Mp3,
        name: "MP3",
        extensions: &["mp3"],
        tag_scheme: TagScheme::Id3v2,
    },
    FileTypeInfo {
        file_type: FileType::Flac,
        name: "FLAC",
        extensions: &["flac"],
        tag_scheme: TagScheme::VorbisComment,
    },
    FileTypeInfo {
        file_type: FileType::Ogg,
        name: "Ogg",
        extensions: &["ogg", "oga", "spx"],
        tag_scheme: TagScheme::VorbisComment,
    },
    FileTypeInfo {
        file_type: FileType::Opus,
        name: "Opus",
        extensions: &["opus"],
        tag_scheme: TagScheme::OpusR128,
    },
    FileTypeInfo {
        file_type: FileType::M4a,
        name: "MP4",
        extensions: &["m4a", "mp4"],
        tag_scheme: TagScheme::Mp4,
    },
    FileTypeInfo {
        file_type: FileType::Wma,
        name: "WMA",
        extensions: &["wma"],
        tag_scheme: TagScheme::Unsupported,
    },
    FileTypeInfo {
        file_type: FileType::Wav,
        name: "WAV",
        extensions: &["wav"],
        tag_scheme: TagScheme::Id3v2,
    },
    FileTypeInfo {
        file_type: FileType::Aiff,
        name: "AIFF",
        extensions: &["aiff", "aif"],
        tag_scheme: TagScheme::Id3v2,
    },
    FileTypeInfo {
        file_type: FileType::WavPack,
        name: "WavPack",
        extensions: &["wv"],
        tag_scheme: TagScheme::Ape,
    },
    FileTypeInfo {
        file_type: FileType::Ape,
        name: "Monkey's Audio",
        extensions: &["ape"],
        tag_scheme: TagScheme::Ape,
    },
    FileTypeInfo {
        file_type: FileType::Tak,
        name: "TAK",
        extensions: &["tak"],
        tag_scheme: TagScheme::Unsupported,
    },
    FileTypeInfo {
        file_type: FileType::Mpc,
        name: "Musepack",
        extensions: &["mpc"],
        tag_scheme: TagScheme::Ape,
    },
];

impl FileType {
    /// Every variant, in table order
    pub const ALL: [FileType; 15] = [
        Self::Invalid,
        Self::Default,
        Self::Mp2,
        Self::Mp3,
        Self::Flac,
        Self::Ogg,
        Self::Opus,
        Self::M4a,
        Self::Wma,
        Self::Wav,
        Self::Aiff,
        Self::WavPack,
        Self::Ape,
        Self::Tak,
        Self::Mpc,
    ];

    fn info(self) -> &'static FileTypeInfo {
        // Table rows are declared in variant order
        &FILE_TYPES[self as usize]
    }

    /// Classify a path by its extension (case-insensitive)
    ///
    /// Returns [`FileType::Invalid`] when the path has no extension and
    /// [`FileType::Default`] when the extension is not recognised.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_extension(ext),
            None => Self::Invalid,
        }
    }

    /// Classify a bare extension (without the dot)
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|file_type| file_type.extensions().contains(&ext.as_str()))
            .unwrap_or(Self::Default)
    }

    /// Whether files of this type are picked up by directory enumeration
    ///
    /// This is about the type being known and taggable. Whether the samples
    /// can be measured depends on the backend, see
    /// [`DecodeBackend::can_decode`](crate::decode::DecodeBackend::can_decode).
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Invalid | Self::Default)
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn extensions(self) -> &'static [&'static str] {
        self.info().extensions
    }

    pub fn tag_scheme(self) -> TagScheme {
        self.info().tag_scheme
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Decoding backend seam
//!
//! Tracks never talk to a decoder library directly. They ask a
//! [`DecodeBackend`] for a [`PcmStream`] and pull interleaved `f32` blocks
//! from it until the stream is exhausted.
//!
//! Opening a stream is the only place where the process-wide [`DecodeLock`]
//! is taken: probing and codec setup are serialised, decoding is not.

use crate::error::{Result, ScanError};
use crate::file_type::FileType;
use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{self, CodecType, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Lock serialising decoder initialisation across worker threads
pub type DecodeLock = Mutex<()>;

/// Take the decode lock if one was given; a poisoned lock is still usable
pub(crate) fn acquire(lock: Option<&DecodeLock>) -> Option<MutexGuard<'_, ()>> {
    lock.map(|l| l.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Parameters of an opened stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub channels: u32,
    pub sample_rate: u32,
    /// File type after content detection (never `Default` if the codec is known)
    pub file_type: FileType,
    /// Container display name
    pub container: String,
    /// Codec short name
    pub codec: String,
}

/// Source of decoded, interleaved PCM
pub trait PcmStream {
    fn info(&self) -> &StreamInfo;

    /// Next block of interleaved samples, `None` at end of stream
    ///
    /// Blocks always hold whole frames.
    fn next_block(&mut self) -> Result<Option<&[f32]>>;
}

/// Factory for [`PcmStream`]s
pub trait DecodeBackend: Send + Sync {
    /// Open `path` for decoding
    ///
    /// Implementations hold `lock` (when given) only while probing the
    /// container and creating the decoder.
    fn open(
        &self,
        path: &Path,
        file_type: FileType,
        lock: Option<&DecodeLock>,
    ) -> Result<Box<dyn PcmStream>>;

    /// Whether streams of `file_type` can be opened at all
    fn can_decode(&self, _file_type: FileType) -> bool {
        true
    }
}

/// Decoding backend built on symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DecodeBackend for SymphoniaBackend {
    fn open(
        &self,
        path: &Path,
        file_type: FileType,
        lock: Option<&DecodeLock>,
    ) -> Result<Box<dyn PcmStream>> {
        if !path.exists() {
            return Err(ScanError::FileNotFound(path.to_path_buf()));
        }

        let guard = acquire(lock);
        let stream = SymphoniaStream::open(path, file_type)?;
        drop(guard);

        Ok(Box::new(stream))
    }

    fn can_decode(&self, file_type: FileType) -> bool {
        // No symphonia codec for these
        !matches!(
            file_type,
            FileType::Opus
                | FileType::Wma
                | FileType::WavPack
                | FileType::Ape
                | FileType::Tak
                | FileType::Mpc
        )
    }
}

/// Stream over the first audio track of a container
pub struct SymphoniaStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: StreamInfo,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaStream {
    fn open(path: &Path, file_type: FileType) -> Result<Self> {
        let unreadable = |reason: String| ScanError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Let the probe try the extension first
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| unreadable(format!("failed to probe container: {e}")))?;

        let format = probed.format;

        let track = format
            .default_track()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .or_else(|| {
                format
                    .tracks()
                    .iter()
                    .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            })
            .ok_or_else(|| unreadable("no audio track found".to_string()))?;

        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| unreadable("unknown sample rate".to_string()))?;
        let channels = params
            .channels
            .ok_or_else(|| unreadable("unknown channel layout".to_string()))?
            .count() as u32;

        let codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map_or("unknown", |d| d.short_name)
            .to_string();

        let decoder =
            symphonia::default::get_codecs().make(params, &DecoderOptions::default())?;

        let file_type = match file_type {
            FileType::Default | FileType::Invalid => detect_file_type(params.codec),
            known => known,
        };

        let info = StreamInfo {
            channels,
            sample_rate,
            file_type,
            container: file_type.name().to_string(),
            codec,
        };

        tracing::debug!(
            "Opened {}: {} / {}, {} Hz, {} ch",
            path.display(),
            info.container,
            info.codec,
            sample_rate,
            channels
        );

        Ok(Self {
            track_id: track.id,
            format,
            decoder,
            info,
            sample_buf: None,
        })
    }
}

impl PcmStream for SymphoniaStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_block(&mut self) -> Result<Option<&[f32]>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                // Chained streams change parameters mid-file; the first one is all we measure
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let needed = decoded.capacity() * spec.channels.count();
            let reuse = self
                .sample_buf
                .as_ref()
                .is_some_and(|buf| buf.capacity() >= needed);
            if !reuse {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
            }

            return Ok(self.sample_buf.as_ref().map(SampleBuffer::samples));
        }
    }
}

/// Best guess of a file type from the codec of its first audio track
pub fn detect_file_type(codec: CodecType) -> FileType {
    match codec {
        codecs::CODEC_TYPE_MP3 => FileType::Mp3,
        codecs::CODEC_TYPE_MP1 | codecs::CODEC_TYPE_MP2 => FileType::Mp2,
        codecs::CODEC_TYPE_FLAC => FileType::Flac,
        codecs::CODEC_TYPE_VORBIS => FileType::Ogg,
        codecs::CODEC_TYPE_OPUS => FileType::Opus,
        codecs::CODEC_TYPE_AAC | codecs::CODEC_TYPE_ALAC => FileType::M4a,
        codecs::CODEC_TYPE_WAVPACK => FileType::WavPack,
        codecs::CODEC_TYPE_PCM_S16LE
        | codecs::CODEC_TYPE_PCM_S24LE
        | codecs::CODEC_TYPE_PCM_S32LE
        | codecs::CODEC_TYPE_PCM_F32LE
        | codecs::CODEC_TYPE_PCM_F64LE
        | codecs::CODEC_TYPE_PCM_U8 => FileType::Wav,
        codecs::CODEC_TYPE_PCM_S16BE
        | codecs::CODEC_TYPE_PCM_S24BE
        | codecs::CODEC_TYPE_PCM_S32BE
        | codecs::CODEC_TYPE_PCM_F32BE
        | codecs::CODEC_TYPE_PCM_F64BE => FileType::Aiff,
        _ => FileType::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type(codecs::CODEC_TYPE_MP3), FileType::Mp3);
        assert_eq!(detect_file_type(codecs::CODEC_TYPE_PCM_S16LE), FileType::Wav);
        assert_eq!(detect_file_type(codecs::CODEC_TYPE_PCM_S16BE), FileType::Aiff);
        assert_eq!(detect_file_type(CODEC_TYPE_NULL), FileType::Default);
    }

    #[test]
    fn test_symphonia_codec_coverage() {
        let backend = SymphoniaBackend::new();
        for file_type in [
            FileType::Mp3,
            FileType::Flac,
            FileType::Ogg,
            FileType::Wav,
            FileType::Default,
        ] {
            assert!(backend.can_decode(file_type), "{file_type}");
        }
        for file_type in [FileType::Opus, FileType::Wma, FileType::Ape, FileType::Mpc] {
            assert!(!backend.can_decode(file_type), "{file_type}");
        }
    }

    #[test]
    fn test_missing_file() {
        let result = SymphoniaBackend::new().open(
            Path::new("/definitely/not/here.flac"),
            FileType::Flac,
            None,
        );
        assert!(matches!(result, Err(ScanError::FileNotFound(_))));
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not an mp3 file at all").unwrap();

        let lock = DecodeLock::default();
        let result = SymphoniaBackend::new().open(&path, FileType::Mp3, Some(&lock));
        assert!(result.is_err());
        // Lock is released on the error path
        assert!(lock.try_lock().is_ok());
    }
}

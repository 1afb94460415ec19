//! Shared fixtures: an in-memory decoding backend and recording tag writers

#![allow(dead_code)]

use rgscan_loudness::db_to_linear;
use rgscan_scanner::{
    DecodeBackend, DecodeLock, FileType, PcmStream, Result, ScanError, StreamInfo, TagOptions,
    TagRequest, TagWriter,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SAMPLE_RATE: u32 = 48000;
pub const CHANNELS: u32 = 2;

/// What the synthetic backend produces for a file name
#[derive(Debug, Clone, Copy)]
pub enum Fixture {
    /// 1 kHz stereo sine, optionally with a single spike sample
    Sine {
        amplitude_db: f64,
        seconds: f32,
        spike_db: Option<f64>,
    },
    /// Digital silence
    Silence { seconds: f32 },
    /// Shorter than one gating block
    TooShort,
    /// Fails to open
    Corrupt,
}

impl Fixture {
    pub fn sine(amplitude_db: f64) -> Self {
        Self::Sine {
            amplitude_db,
            seconds: 3.0,
            spike_db: None,
        }
    }

    pub fn sine_with_spike(amplitude_db: f64, spike_db: f64) -> Self {
        Self::Sine {
            amplitude_db,
            seconds: 3.0,
            spike_db: Some(spike_db),
        }
    }
}

/// Generate interleaved stereo samples for a fixture
pub fn render(fixture: Fixture) -> Vec<f32> {
    match fixture {
        Fixture::Sine {
            amplitude_db,
            seconds,
            spike_db,
        } => {
            let amplitude = db_to_linear(amplitude_db) as f32;
            let frames = (SAMPLE_RATE as f32 * seconds) as usize;
            let mut samples = Vec::with_capacity(frames * CHANNELS as usize);
            for i in 0..frames {
                let t = i as f32 / SAMPLE_RATE as f32;
                let sample = amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
                for _ in 0..CHANNELS {
                    samples.push(sample);
                }
            }
            if let Some(spike_db) = spike_db {
                let middle = samples.len() / 2;
                samples[middle] = db_to_linear(spike_db) as f32;
            }
            samples
        }
        Fixture::Silence { seconds } => {
            vec![0.0; (SAMPLE_RATE as f32 * seconds) as usize * CHANNELS as usize]
        }
        Fixture::TooShort => render(Fixture::Sine {
            amplitude_db: -20.0,
            seconds: 0.1,
            spike_db: None,
        }),
        Fixture::Corrupt => Vec::new(),
    }
}

/// Decoding backend serving generated PCM keyed by file name
#[derive(Default)]
pub struct SyntheticBackend {
    fixtures: HashMap<String, Fixture>,
    opened: AtomicUsize,
    opened_with_lock: AtomicUsize,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, fixture: Fixture) -> Self {
        self.fixtures.insert(name.to_string(), fixture);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn opened_with_lock(&self) -> usize {
        self.opened_with_lock.load(Ordering::SeqCst)
    }
}

impl DecodeBackend for SyntheticBackend {
    fn open(
        &self,
        path: &Path,
        file_type: FileType,
        lock: Option<&DecodeLock>,
    ) -> Result<Box<dyn PcmStream>> {
        let _guard = lock.map(|l| l.lock().unwrap());
        self.opened.fetch_add(1, Ordering::SeqCst);
        if lock.is_some() {
            self.opened_with_lock.fetch_add(1, Ordering::SeqCst);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fixture = self
            .fixtures
            .get(&name)
            .copied()
            .ok_or_else(|| ScanError::FileNotFound(path.to_path_buf()))?;

        if let Fixture::Corrupt = fixture {
            return Err(ScanError::Unreadable {
                path: path.to_path_buf(),
                reason: "invalid data found when processing input".to_string(),
            });
        }

        let file_type = match file_type {
            FileType::Default => FileType::Flac,
            other => other,
        };

        Ok(Box::new(VecStream {
            info: StreamInfo {
                channels: CHANNELS,
                sample_rate: SAMPLE_RATE,
                file_type,
                container: file_type.name().to_string(),
                codec: "pcm_f32le".to_string(),
            },
            samples: render(fixture),
            position: 0,
        }))
    }
}

struct VecStream {
    info: StreamInfo,
    samples: Vec<f32>,
    position: usize,
}

impl PcmStream for VecStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_block(&mut self) -> Result<Option<&[f32]>> {
        // 1152 frames, like an MP3 decoder
        let block = 1152 * CHANNELS as usize;
        if self.position >= self.samples.len() {
            return Ok(None);
        }
        let end = (self.position + block).min(self.samples.len());
        let start = std::mem::replace(&mut self.position, end);
        Ok(Some(&self.samples[start..end]))
    }
}

/// One recorded tag operation
#[derive(Debug, Clone, PartialEq)]
pub enum TagCall {
    Write {
        path: PathBuf,
        track_gain: f64,
        album_gain: Option<f64>,
    },
    Delete {
        path: PathBuf,
    },
}

/// Tag writer that records calls and optionally fails them
#[derive(Default)]
pub struct RecordingWriter {
    calls: Mutex<Vec<TagCall>>,
    fail: bool,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::default(),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TagCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(ScanError::TagWriteError("read-only file system".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TagWriter for RecordingWriter {
    fn write_tags(&self, request: &TagRequest<'_>) -> Result<()> {
        self.record(TagCall::Write {
            path: request.path.to_path_buf(),
            track_gain: request.track.gain_db,
            album_gain: request.album.map(|a| a.gain_db),
        })
    }

    fn delete_tags(&self, _file_type: FileType, path: &Path, _options: &TagOptions) -> Result<()> {
        self.record(TagCall::Delete {
            path: path.to_path_buf(),
        })
    }
}

/// Create placeholder files so job factories find them on disk
pub fn touch_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"placeholder").expect("Failed to create fixture file");
            path
        })
        .collect()
}

/// Write a 16-bit stereo sine WAV with hound
pub fn write_sine_wav(path: &Path, sample_rate: u32, amplitude_db: f64, seconds: f32) {
    use hound::{SampleFormat, WavSpec, WavWriter};

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("Failed to create test WAV file");

    let amplitude = db_to_linear(amplitude_db) as f32;
    let frames = (sample_rate as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        let value = (sample * f32::from(i16::MAX)) as i16;
        writer.write_sample(value).unwrap();
        writer.write_sample(value).unwrap();
    }
    writer.finalize().expect("Failed to finalize test WAV file");
}

//! EBU R128 loudness analysis
//!
//! One [`LoudnessAnalyzer`] wraps one ebur128 session for one decoded stream.
//! It measures:
//! - Integrated loudness (LUFS) - the overall perceived loudness
//! - Sample peak - the maximum sample value
//! - True peak - the maximum inter-sample peak (4x oversampling below 96 kHz)
//!
//! Several sessions can be merged with [`LoudnessAnalyzer::combine`] to get the
//! loudness of their concatenation (album loudness) without decoding anything
//! twice.

use crate::error::{LoudnessError, Result};
use crate::linear_to_db;
use ebur128::{EbuR128, Mode};
use std::fmt;

/// Shortest stretch of audio that yields a gating block, in seconds
const GATING_BLOCK_SECONDS: f64 = 0.4;

/// Which peak measurement a session should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakMode {
    /// Raw sample peak only
    #[default]
    Sample,
    /// Oversampled true peak (sample peak is always measured as well)
    True,
}

impl PeakMode {
    fn ebur128_mode(self) -> Mode {
        match self {
            Self::Sample => Mode::I | Mode::SAMPLE_PEAK,
            Self::True => Mode::I | Mode::SAMPLE_PEAK | Mode::TRUE_PEAK,
        }
    }
}

/// Snapshot of the loudness characteristics of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessInfo {
    /// Integrated loudness in LUFS
    pub integrated_lufs: f64,

    /// Sample peak, linear (1.0 = full scale)
    pub sample_peak: f64,

    /// True peak, linear. `None` when the session only measured sample peaks
    pub true_peak: Option<f64>,

    /// Duration of the analyzed audio in seconds
    pub duration_seconds: f64,

    /// Sample rate of the analyzed audio
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u32,
}

impl LoudnessInfo {
    /// Peak selected by `mode`, falling back to the sample peak when no true peak exists
    pub fn peak(&self, mode: PeakMode) -> f64 {
        match mode {
            PeakMode::Sample => self.sample_peak,
            PeakMode::True => self.true_peak.unwrap_or(self.sample_peak),
        }
    }

    /// Sample peak in dBFS
    pub fn sample_peak_dbfs(&self) -> f64 {
        linear_to_db(self.sample_peak)
    }

    /// True peak in dBTP
    pub fn true_peak_dbfs(&self) -> Option<f64> {
        self.true_peak.map(linear_to_db)
    }
}

impl fmt::Display for LoudnessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loudness: {:.1} LUFS, Sample Peak: {:.1} dBFS",
            self.integrated_lufs,
            self.sample_peak_dbfs()
        )?;
        if let Some(tp) = self.true_peak_dbfs() {
            write!(f, ", True Peak: {:.1} dBTP", tp)?;
        }
        Ok(())
    }
}

/// EBU R128 loudness analyzer
///
/// Owns exactly one ebur128 session. The session is released when the
/// analyzer is dropped.
///
/// # Example
///
/// ```ignore
/// use rgscan_loudness::{LoudnessAnalyzer, PeakMode};
///
/// let mut analyzer = LoudnessAnalyzer::new(2, 44100, PeakMode::True)?;
///
/// // Feed audio samples (interleaved f32)
/// analyzer.add_frames(&audio_samples)?;
///
/// println!("Integrated loudness: {:.1} LUFS", analyzer.integrated_loudness()?);
/// ```
pub struct LoudnessAnalyzer {
    /// EBU R128 session
    ebur128: EbuR128,
    /// Sample rate
    sample_rate: u32,
    /// Number of channels
    channels: u32,
    /// Peak measurement carried by the session
    peak_mode: PeakMode,
    /// Total samples processed (all channels)
    samples_processed: usize,
}

impl fmt::Debug for LoudnessAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoudnessAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("peak_mode", &self.peak_mode)
            .field("samples_processed", &self.samples_processed)
            .finish()
    }
}

impl LoudnessAnalyzer {
    /// Create a new loudness session
    ///
    /// # Arguments
    /// * `channels` - Number of channels (1-8)
    /// * `sample_rate` - Sample rate in Hz (8000-384000)
    /// * `peak_mode` - Whether the true peak has to be measured
    ///
    /// # Errors
    /// Returns error if sample rate or channel count is unsupported
    pub fn new(channels: u32, sample_rate: u32, peak_mode: PeakMode) -> Result<Self> {
        if !(8000..=384_000).contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }
        if !(1..=8).contains(&channels) {
            return Err(LoudnessError::InvalidChannelCount(channels));
        }

        let ebur128 = EbuR128::new(channels, sample_rate, peak_mode.ebur128_mode())?;

        Ok(Self {
            ebur128,
            sample_rate,
            channels,
            peak_mode,
            samples_processed: 0,
        })
    }

    fn check_alignment(&self, len: usize) -> Result<()> {
        if len % self.channels as usize != 0 {
            return Err(LoudnessError::MisalignedFrames {
                samples: len,
                channels: self.channels,
            });
        }
        Ok(())
    }

    /// Add audio frames for analysis
    ///
    /// # Arguments
    /// * `samples` - Interleaved audio samples as f32 (-1.0 to 1.0)
    ///
    /// # Notes
    /// - Samples should be interleaved (L R L R... for stereo)
    /// - Length must be divisible by channel count
    pub fn add_frames(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.check_alignment(samples.len())?;

        self.ebur128.add_frames_f32(samples)?;
        self.samples_processed += samples.len();

        Ok(())
    }

    /// Integrated loudness in LUFS over every frame seen so far
    ///
    /// # Errors
    /// `InsufficientData` if less than one 400 ms block was supplied,
    /// `SilentAudio` if every block fell below the absolute gate.
    pub fn integrated_loudness(&self) -> Result<f64> {
        if !self.has_gating_block() {
            return Err(LoudnessError::InsufficientData {
                frames: self.frames_processed(),
                sample_rate: self.sample_rate,
            });
        }

        let loudness = self.ebur128.loudness_global()?;
        if loudness.is_infinite() || loudness.is_nan() {
            return Err(LoudnessError::SilentAudio);
        }
        Ok(loudness)
    }

    /// Sample peak (linear), maximum across all channels
    pub fn sample_peak(&self) -> Result<f64> {
        let mut peak = 0.0_f64;
        for ch in 0..self.channels {
            peak = peak.max(self.ebur128.sample_peak(ch)?);
        }
        Ok(peak)
    }

    /// True peak (linear), maximum across all channels
    ///
    /// Never smaller than [`sample_peak`](Self::sample_peak) for the same session.
    pub fn true_peak(&self) -> Result<f64> {
        if self.peak_mode != PeakMode::True {
            return Err(LoudnessError::PeakUnavailable);
        }

        let mut peak = 0.0_f64;
        for ch in 0..self.channels {
            let true_peak = self.ebur128.true_peak(ch)?;
            let sample_peak = self.ebur128.sample_peak(ch)?;
            peak = peak.max(true_peak.max(sample_peak));
        }
        Ok(peak)
    }

    /// Peak selected by `mode`
    pub fn peak(&self, mode: PeakMode) -> Result<f64> {
        match mode {
            PeakMode::Sample => self.sample_peak(),
            PeakMode::True => self.true_peak(),
        }
    }

    /// Take a snapshot of the current measurements
    pub fn info(&self) -> Result<LoudnessInfo> {
        if self.samples_processed == 0 {
            return Err(LoudnessError::InsufficientData {
                frames: 0,
                sample_rate: self.sample_rate,
            });
        }

        let integrated_lufs = self.integrated_loudness()?;
        let true_peak = match self.peak_mode {
            PeakMode::True => Some(self.true_peak()?),
            PeakMode::Sample => None,
        };

        Ok(LoudnessInfo {
            integrated_lufs,
            sample_peak: self.sample_peak()?,
            true_peak,
            duration_seconds: self.frames_processed() as f64 / self.sample_rate as f64,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    /// Combine several sessions into one album-level aggregate
    ///
    /// Loudness of the aggregate is computed from the gating blocks of every
    /// session, so the result does not depend on the order of `sessions`.
    pub fn combine<'a, I>(sessions: I) -> Result<CombinedSession<'a>>
    where
        I: IntoIterator<Item = &'a LoudnessAnalyzer>,
    {
        let sessions: Vec<&'a LoudnessAnalyzer> = sessions.into_iter().collect();
        if sessions.is_empty() {
            return Err(LoudnessError::NoSessions);
        }
        tracing::debug!("Combining {} loudness sessions", sessions.len());
        Ok(CombinedSession { sessions })
    }

    /// Number of frames (samples per channel) processed
    pub fn frames_processed(&self) -> usize {
        self.samples_processed / self.channels as usize
    }

    /// Get the number of samples processed
    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Sample rate of the session
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the session
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Peak measurement carried by the session
    pub fn peak_mode(&self) -> PeakMode {
        self.peak_mode
    }

    fn has_gating_block(&self) -> bool {
        self.frames_processed() as f64 >= self.sample_rate as f64 * GATING_BLOCK_SECONDS
    }
}

/// Aggregate of several [`LoudnessAnalyzer`] sessions
///
/// Answers the same questions as a single session, as if every stream had
/// been fed into one analyzer back to back.
#[derive(Debug)]
pub struct CombinedSession<'a> {
    sessions: Vec<&'a LoudnessAnalyzer>,
}

impl CombinedSession<'_> {
    /// Integrated loudness of the concatenation, in LUFS
    pub fn integrated_loudness(&self) -> Result<f64> {
        if !self.sessions.iter().any(|s| s.has_gating_block()) {
            return Err(LoudnessError::InsufficientData {
                frames: self.frames_processed(),
                sample_rate: self.sessions[0].sample_rate,
            });
        }

        let loudness = EbuR128::loudness_global_multiple(self.sessions.iter().map(|s| &s.ebur128))?;
        if loudness.is_infinite() || loudness.is_nan() {
            return Err(LoudnessError::SilentAudio);
        }
        Ok(loudness)
    }

    /// Largest sample peak among the sessions (linear)
    pub fn sample_peak(&self) -> Result<f64> {
        self.sessions
            .iter()
            .try_fold(0.0_f64, |acc, s| Ok(acc.max(s.sample_peak()?)))
    }

    /// Largest true peak among the sessions (linear)
    pub fn true_peak(&self) -> Result<f64> {
        self.sessions
            .iter()
            .try_fold(0.0_f64, |acc, s| Ok(acc.max(s.true_peak()?)))
    }

    /// Peak selected by `mode`
    pub fn peak(&self, mode: PeakMode) -> Result<f64> {
        match mode {
            PeakMode::Sample => self.sample_peak(),
            PeakMode::True => self.true_peak(),
        }
    }

    /// Number of sessions in the aggregate
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always false; an aggregate cannot be built from nothing
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total frames across all sessions
    pub fn frames_processed(&self) -> usize {
        self.sessions.iter().map(|s| s.frames_processed()).sum()
    }
}

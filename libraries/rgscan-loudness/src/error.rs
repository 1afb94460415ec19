//! Error types for loudness analysis

use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness analysis
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(u32),

    /// EBU R128 analysis error
    #[error("EBU R128 analysis failed: {0}")]
    AnalysisError(String),

    /// Sample count does not line up with the channel layout
    #[error("Sample count {samples} is not divisible by channel count {channels}")]
    MisalignedFrames { samples: usize, channels: u32 },

    /// Less than one gating block (400 ms) was supplied
    #[error("Insufficient audio for loudness measurement ({frames} frames at {sample_rate} Hz)")]
    InsufficientData { frames: usize, sample_rate: u32 },

    /// Audio is completely silent
    #[error("Audio is silent (no loudness data available)")]
    SilentAudio,

    /// True peak requested from a session created without true-peak measurement
    #[error("True peak was not measured for this session")]
    PeakUnavailable,

    /// Album combination called without any session
    #[error("Cannot combine an empty set of loudness sessions")]
    NoSessions,
}

impl LoudnessError {
    /// Whether this error came from session creation (unsupported stream layout)
    pub fn is_init_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSampleRate(_) | Self::InvalidChannelCount(_)
        )
    }
}

impl From<ebur128::Error> for LoudnessError {
    fn from(err: ebur128::Error) -> Self {
        Self::AnalysisError(format!("{:?}", err))
    }
}

//! Loudness measurement for rgscan
//!
//! This crate provides:
//! - EBU R128 loudness sessions (integrated LUFS, sample peak, true peak)
//! - Album aggregation of several sessions without re-decoding
//! - The clipping policy that caps gains against a peak ceiling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌───────────────┐
//! │ PCM frames  │ ──► │ LoudnessAnalyzer │ ──► │ LoudnessInfo  │
//! └─────────────┘     └──────────────────┘     └───────────────┘
//!                            │ combine()
//!                            ▼
//!                     ┌─────────────────┐     ┌───────────────┐
//!                     │ CombinedSession │ ──► │ ClippingGuard │
//!                     └─────────────────┘     └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rgscan_loudness::{ClipMode, ClipScope, ClippingGuard, LoudnessAnalyzer, PeakMode};
//!
//! let mut analyzer = LoudnessAnalyzer::new(2, 44100, PeakMode::True)?;
//! analyzer.add_frames(&audio_samples)?;
//!
//! let gain = REPLAYGAIN_REFERENCE_LUFS - analyzer.integrated_loudness()?;
//! let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, EBU_R128_MAX_PEAK_DB);
//! let gain = guard.check(gain, analyzer.true_peak()?, ClipScope::Track).resolve(gain);
//! ```

#![deny(unsafe_code)]

mod analyzer;
mod clipping;
mod error;

pub use analyzer::{CombinedSession, LoudnessAnalyzer, LoudnessInfo, PeakMode};
pub use clipping::{clip_safe_gain, ClipDecision, ClipMode, ClipScope, ClippingGuard};
pub use error::{LoudnessError, Result};

/// ReplayGain 2.0 reference loudness level (-18 LUFS)
pub const REPLAYGAIN_REFERENCE_LUFS: f64 = -18.0;

/// EBU R128 broadcast reference level (-23 LUFS), also the Opus R128 tag reference
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// EBU R128 maximum permitted true peak (-1 dBTP)
pub const EBU_R128_MAX_PEAK_DB: f64 = -1.0;

/// Quietest accepted target loudness
pub const MIN_TARGET_LOUDNESS: f64 = -30.0;

/// Loudest accepted target loudness
pub const MAX_TARGET_LOUDNESS: f64 = -5.0;

/// Convert a linear amplitude to dB (`-inf` for silence)
pub fn linear_to_db(value: f64) -> f64 {
    if value > 0.0 {
        20.0 * value.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Convert dB to a linear amplitude
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

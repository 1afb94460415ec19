//! Process-wide scan statistics

use crate::job::ScanJob;
use std::path::PathBuf;

/// Totals accumulated over every finished job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanData {
    /// Tracks with a result
    pub files: usize,
    /// Tracks that could not be measured
    pub skipped: usize,
    /// Tracks whose track or album gain was lowered
    pub clipping_adjustments: usize,
    /// Sum of applied gains (album gain when album mode produced one)
    pub total_gain: f64,
    /// Sum of reported peaks
    pub total_peak: f64,
    /// Tracks with a negative gain
    pub total_negative: usize,
    /// Tracks with a positive gain
    pub total_positive: usize,
    /// Jobs where no track could be measured
    pub error_directories: Vec<PathBuf>,
}

impl ScanData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished job into the totals
    pub fn fold(&mut self, job: &ScanJob) {
        self.skipped += job.skipped();

        if job.error() {
            self.error_directories.push(job.path().to_path_buf());
            return;
        }

        self.clipping_adjustments += job.clipping_adjustments();

        for track in job.tracks().iter().filter(|t| t.is_success()) {
            let Some(result) = track.album_result().or(track.result()) else {
                continue;
            };

            self.files += 1;
            self.total_gain += result.gain_db;
            self.total_peak += result.peak;
            if result.gain_db < 0.0 {
                self.total_negative += 1;
            } else if result.gain_db > 0.0 {
                self.total_positive += 1;
            }
        }
    }

    /// Mean applied gain, `None` before any track succeeded
    pub fn average_gain(&self) -> Option<f64> {
        (self.files > 0).then(|| self.total_gain / self.files as f64)
    }

    /// Mean linear peak, `None` before any track succeeded
    pub fn average_peak(&self) -> Option<f64> {
        (self.files > 0).then(|| self.total_peak / self.files as f64)
    }

    /// Any job failed entirely
    pub fn has_errors(&self) -> bool {
        !self.error_directories.is_empty()
    }
}

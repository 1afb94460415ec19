/// Scan report rendering
use rgscan_loudness::linear_to_db;
use rgscan_scanner::{Config, ScanData, ScanJob, ScanResult, Track};
use std::io::{self, Write};
use std::time::Duration;

const TAB_HEADER: &str =
    "Filename\tLoudness (LUFS)\tGain (dB)\tPeak\tPeak (dB)\tPeak Type\tClipping Adjustment?";

fn peak_type(config: &Config) -> &'static str {
    if config.true_peak() {
        "True"
    } else {
        "Sample"
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn write_block<W: Write>(
    out: &mut W,
    result: &ScanResult,
    clipped: bool,
    config: &Config,
) -> io::Result<()> {
    writeln!(out, "  Loudness: {:8.2} LUFS", result.loudness_lufs)?;
    writeln!(
        out,
        "      Peak: {:8.6} ({:.2} dB{})",
        result.peak,
        linear_to_db(result.peak),
        if config.true_peak() { "TP" } else { "" }
    )?;
    writeln!(
        out,
        "      Gain: {:8.2} dB{}",
        result.gain_db,
        if clipped {
            " (adjusted to prevent clipping)"
        } else {
            ""
        }
    )
}

fn write_tab_row<W: Write>(
    out: &mut W,
    name: &str,
    result: &ScanResult,
    clipped: bool,
    config: &Config,
) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{:.2}\t{:.2}\t{:.6}\t{:.2}\t{}\t{}",
        name,
        result.loudness_lufs,
        result.gain_db,
        result.peak,
        linear_to_db(result.peak),
        peak_type(config),
        if clipped { "Y" } else { "N" }
    )
}

fn track_name(track: &Track) -> String {
    track
        .path()
        .file_name()
        .map_or_else(|| track.path().display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Per-track (and album) results of one job
pub fn write_job<W: Write>(out: &mut W, job: &ScanJob, config: &Config) -> io::Result<()> {
    if config.tab_output() {
        return write_job_tab(out, job, config);
    }

    if job.error() {
        writeln!(out, "Failed to scan {}", job.path().display())?;
        return Ok(());
    }

    for track in job.tracks() {
        writeln!(out, "Track: {}", track.path().display())?;
        match track.result() {
            Some(result) => write_block(out, result, track.tclip(), config)?,
            None => writeln!(
                out,
                "  Skipped: {}",
                track.error().unwrap_or("not measured")
            )?,
        }
        if let Some(error) = track.tag_error() {
            writeln!(out, "  Tagging failed: {error}")?;
        }
        writeln!(out)?;
    }

    if let Some(album) = job.album_result() {
        let aclip = job.tracks().iter().any(Track::aclip);
        writeln!(out, "Album: {}", job.path().display())?;
        write_block(out, album, aclip, config)?;
        writeln!(out)?;
    }

    Ok(())
}

fn write_job_tab<W: Write>(out: &mut W, job: &ScanJob, config: &Config) -> io::Result<()> {
    writeln!(out, "{TAB_HEADER}")?;

    for track in job.tracks() {
        if let Some(result) = track.result() {
            write_tab_row(out, &track_name(track), result, track.tclip(), config)?;
        }
    }

    if let Some(album) = job.album_result() {
        let aclip = job.tracks().iter().any(Track::aclip);
        write_tab_row(out, "Album", album, aclip, config)?;
    }

    Ok(())
}

/// Totals over every job of an easy-mode run
pub fn write_summary<W: Write>(out: &mut W, data: &ScanData, elapsed: Duration) -> io::Result<()> {
    let files = data.files;
    let neutral = files.saturating_sub(data.total_negative + data.total_positive);

    writeln!(out, "Scanning complete")?;
    writeln!(out, "Time elapsed:     {:.1} s", elapsed.as_secs_f64())?;
    writeln!(out, "Files scanned:    {files}")?;
    if data.skipped > 0 {
        writeln!(out, "Files skipped:    {}", data.skipped)?;
    }
    writeln!(
        out,
        "Clip adjustments: {} ({:.1}% of files)",
        data.clipping_adjustments,
        percent(data.clipping_adjustments, files)
    )?;

    if let (Some(gain), Some(peak)) = (data.average_gain(), data.average_peak()) {
        writeln!(out, "Average gain:     {gain:.2} dB")?;
        writeln!(out, "Average peak:     {peak:.6} ({:.2} dB)", linear_to_db(peak))?;
    }

    writeln!(
        out,
        "Negative gains:   {} ({:.1}% of files)",
        data.total_negative,
        percent(data.total_negative, files)
    )?;
    writeln!(
        out,
        "Positive gains:   {} ({:.1}% of files)",
        data.total_positive,
        percent(data.total_positive, files)
    )?;
    writeln!(
        out,
        "No gain:          {} ({:.1}% of files)",
        neutral,
        percent(neutral, files)
    )?;

    if data.has_errors() {
        writeln!(out)?;
        writeln!(
            out,
            "There were errors scanning these directories:"
        )?;
        for dir in &data.error_directories {
            writeln!(out, "  {}", dir.display())?;
        }
    }

    Ok(())
}

//! End-to-end tests on real files
//!
//! WAV fixtures are written with hound, decoded through the symphonia
//! backend and tagged with lofty.

mod common;

use common::write_sine_wav;
use rgscan_scanner::tags::read_replaygain_tags;
use rgscan_scanner::{
    Config, FileType, Id3v2Version, JobRunner, LoftyTagWriter, ScanData, ScanJob, SymphoniaBackend,
    TagMode, TagOptions, TagWriter, TrackState,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_symphonia_measures_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 44100, -20.0, 3.0);

    let config = Arc::new(Config::builder().tag_mode(TagMode::Skip).build());
    let mut job = ScanJob::from_files([&path], config).unwrap();
    assert!(job.scan(&SymphoniaBackend::new(), None));

    let track = &job.tracks()[0];
    let result = track.result().unwrap();
    assert_eq!(track.state(), TrackState::Measured);
    assert_eq!(track.file_type(), FileType::Wav);
    assert_eq!(track.container(), "WAV");
    assert!(track.codec().starts_with("pcm"), "codec {}", track.codec());
    assert!((result.loudness_lufs - (-20.0)).abs() < 1.0);
    assert!((result.peak - 0.1).abs() < 0.001);
}

#[test]
fn test_unknown_extension_is_detected_from_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.bin");
    write_sine_wav(&path, 48000, -18.0, 1.0);

    let config = Arc::new(Config::builder().tag_mode(TagMode::Skip).build());
    let mut job = ScanJob::from_files([&path], config).unwrap();
    assert_eq!(job.tracks()[0].file_type(), FileType::Default);

    assert!(job.scan(&SymphoniaBackend::new(), None));
    assert_eq!(job.tracks()[0].file_type(), FileType::Wav);
}

#[test]
fn test_directory_with_corrupt_wav() {
    let dir = tempfile::tempdir().unwrap();
    write_sine_wav(&dir.path().join("01.wav"), 44100, -20.0, 2.0);
    std::fs::write(dir.path().join("02.wav"), b"RIFF\x00\x00\x00\x00garbage").unwrap();
    write_sine_wav(&dir.path().join("03.wav"), 44100, -16.0, 2.0);

    let config = Arc::new(
        Config::builder()
            .album(true)
            .tag_mode(TagMode::Skip)
            .build(),
    );
    let job = ScanJob::from_directory(dir.path(), config).unwrap();

    let data = Mutex::new(ScanData::new());
    let done = JobRunner::new(2).run(vec![job], &LoftyTagWriter::new(), &data);

    let job = &done[0];
    assert!(!job.error());
    assert_eq!(job.skipped(), 1);
    assert_eq!(job.tracks()[1].state(), TrackState::Failed);
    assert!(job.album_result().is_some());

    let data = data.into_inner().unwrap();
    assert_eq!(data.files, 2);
    assert_eq!(data.skipped, 1);
}

#[test]
fn test_write_then_delete_tags() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("01.wav");
    let second = dir.path().join("02.wav");
    write_sine_wav(&first, 44100, -20.0, 2.0);
    write_sine_wav(&second, 44100, -26.0, 2.0);

    let writer = LoftyTagWriter::new();
    let config = Arc::new(
        Config::builder()
            .album(true)
            .id3v2_version(Id3v2Version::V3)
            .build(),
    );
    let mut job = ScanJob::from_files([&first, &second], config).unwrap();
    assert!(job.scan(&SymphoniaBackend::new(), None));
    job.tag_tracks(&writer);
    assert!(job.tag_failures().is_empty(), "{:?}", job.tag_failures());

    let result = *job.tracks()[0].result().unwrap();
    let album = *job.album_result().unwrap();
    let tags = read_replaygain_tags(&first).unwrap();

    assert!((tags.track_gain.unwrap() - result.gain_db).abs() < 0.006);
    assert!((tags.track_peak.unwrap() - result.peak).abs() < 1e-5);
    assert!((tags.album_gain.unwrap() - album.gain_db).abs() < 0.006);
    assert!((tags.album_peak.unwrap() - album.peak).abs() < 1e-5);

    let options = TagOptions::default();
    for path in [&first, &second] {
        writer.delete_tags(FileType::Wav, path, &options).unwrap();
    }

    assert!(read_replaygain_tags(&first).unwrap().is_empty());
    assert!(read_replaygain_tags(&second).unwrap().is_empty());
}

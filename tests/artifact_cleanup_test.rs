//! Signal-time cleanup of staged clips.
//!
//! Kept in its own test binary: cleanup removes every registered artifact in
//! the process, which would race with other tests staging clips.

use robin::audio::artifact::active_artifact_count;
use robin::audio::{AudioFormat, ClipArtifact, cleanup_all_artifacts};
use tempfile::TempDir;

#[test]
fn test_cleanup_removes_in_flight_artifacts() {
    let dir = TempDir::new().unwrap();

    let wav = ClipArtifact::stage(b"RIFF", AudioFormat::Wav, Some(dir.path())).unwrap();
    let mp3 = ClipArtifact::stage(b"ID3", AudioFormat::Mp3, Some(dir.path())).unwrap();
    let paths = [wav.path().to_path_buf(), mp3.path().to_path_buf()];
    assert!(paths.iter().all(|p| p.exists()));
    assert_eq!(active_artifact_count(), 2);

    cleanup_all_artifacts();
    assert!(paths.iter().all(|p| !p.exists()));

    // Guards dropping after cleanup must not fail
    drop(wav);
    drop(mp3);
    assert_eq!(active_artifact_count(), 0);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

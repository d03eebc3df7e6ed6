//! Temporary on-disk staging of uploaded clips.
//!
//! The decoder probes containers from a seekable file, so each upload is
//! written to a uniquely named temporary file for the lifetime of one request.
//! [`ClipArtifact`] removes it when dropped, and the process-wide registry lets
//! the Ctrl+C handler remove artifacts of requests that never finished.

use crate::audio::AudioFormat;
use crate::constants::CLIP_ARTIFACT_PREFIX;
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tempfile::NamedTempFile;

/// RAII guard for a staged clip.
pub struct ClipArtifact {
    file: NamedTempFile,
}

impl ClipArtifact {
    /// Write `bytes` to a fresh temporary file whose extension matches `format`.
    ///
    /// Uses `dir` when given, otherwise the system temp directory.
    pub fn stage(bytes: &[u8], format: AudioFormat, dir: Option<&Path>) -> Result<Self> {
        let dir = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let suffix = format!(".{}", format.extension());

        let mut file = tempfile::Builder::new()
            .prefix(CLIP_ARTIFACT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| Error::ClipStage {
                dir: dir.clone(),
                source: e,
            })?;

        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|e| Error::ClipStage { dir, source: e })?;

        register_artifact(file.path());

        Ok(Self { file })
    }

    /// Path of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for ClipArtifact {
    fn drop(&mut self) {
        // NamedTempFile deletes the file itself once this returns
        unregister_artifact(self.file.path());
    }
}

/// Global registry of staged artifacts for cleanup on signal.
static ACTIVE_ARTIFACTS: LazyLock<Mutex<Vec<PathBuf>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn register_artifact(path: &Path) {
    if let Ok(mut artifacts) = ACTIVE_ARTIFACTS.lock() {
        artifacts.push(path.to_path_buf());
    }
}

fn unregister_artifact(path: &Path) {
    if let Ok(mut artifacts) = ACTIVE_ARTIFACTS.lock() {
        artifacts.retain(|p| p != path);
    }
}

/// Remove every artifact still registered. Called on signal.
pub fn cleanup_all_artifacts() {
    if let Ok(artifacts) = ACTIVE_ARTIFACTS.lock() {
        for path in artifacts.iter() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Number of artifacts currently staged.
pub fn active_artifact_count() -> usize {
    ACTIVE_ARTIFACTS.lock().map_or(0, |artifacts| artifacts.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_writes_bytes_with_extension() {
        let dir = TempDir::new().unwrap();
        let artifact = ClipArtifact::stage(b"RIFF1234", AudioFormat::Wav, Some(dir.path())).unwrap();

        assert!(artifact.path().exists());
        assert_eq!(artifact.path().extension().unwrap(), "wav");
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"RIFF1234");
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let artifact = ClipArtifact::stage(b"fLaC", AudioFormat::Flac, Some(dir.path())).unwrap();
        let path = artifact.path().to_path_buf();

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_stage_into_missing_dir_fails() {
        let result = ClipArtifact::stage(
            b"data",
            AudioFormat::Wav,
            Some(Path::new("/nonexistent/robin/tmp")),
        );
        assert!(matches!(result, Err(Error::ClipStage { .. })));
    }
}

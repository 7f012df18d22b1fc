use crate::MappedFile;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

pub const FILE_NAME: &str = "data.bin";

/// Writes `bytes` to a fresh temp file and opens it as a `MappedFile`.
///
/// The `TempDir` must be kept alive for the duration of the test.
pub fn open_with_content(bytes: &[u8]) -> (TempDir, MappedFile) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(FILE_NAME);
    fs::write(&path, bytes).unwrap();
    let mf = MappedFile::open(&path).unwrap();
    (dir, mf)
}

/// Same as [`open_with_content`] but with an explicit flush threshold.
pub fn open_with_threshold(bytes: &[u8], threshold: usize) -> (TempDir, MappedFile) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(FILE_NAME);
    fs::write(&path, bytes).unwrap();
    let mf = MappedFile::with_threshold(&path, threshold).unwrap();
    (dir, mf)
}

pub fn file_path(dir: &TempDir) -> PathBuf {
    dir.path().join(FILE_NAME)
}

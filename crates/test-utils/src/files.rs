//! Temporary files holding serialized datasets.

use std::path::{Path, PathBuf};

use align_common::Dataset;
use tempfile::TempDir;

/// A fresh temporary directory, removed on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

/// Write `ds` as JSON to `dir/name` and return the path.
pub fn write_dataset(dir: &Path, name: &str, ds: &Dataset) -> PathBuf {
    let path = dir.join(name);
    ds.write_json(&path).expect("failed to write dataset");
    path
}

/// Write a text file (configs, templates) and return the path.
pub fn write_text(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write file");
    path
}

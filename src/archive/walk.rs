//! Leaf-directory selection over the date-partitioned paste tree.
//!
//! A leaf is a directory with no subdirectories, or only a `decoded`
//! subdirectory left behind by earlier extraction passes. The current and
//! previous day's partitions are excluded: the scraper may still be
//! landing files there, and archiving a partition mid-write would race the
//! delete-safety protocol.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use tracing::warn;
use walkdir::WalkDir;

use crate::core::paste::partition_path;

fn is_leaf(dir: &Path) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list directory");
            return false;
        }
    };
    let mut subdirs = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name());
    subdirs.all(|name| name == "decoded")
}

/// Directories eligible for an archive pass, given today's date.
pub fn eligible_leaf_dirs(root: &Path, today: NaiveDate) -> Vec<PathBuf> {
    let excluded = [
        partition_path(root, today),
        partition_path(root, today - Duration::days(1)),
    ];
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .filter(|path| !excluded.contains(path))
        // `decoded` directories are extraction output, not partitions.
        .filter(|path| path.file_name().map(|n| n != "decoded").unwrap_or(true))
        .filter(|path| is_leaf(path))
        .collect();
    dirs.sort();
    dirs
}

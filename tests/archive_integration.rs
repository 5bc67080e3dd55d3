//! Archive manager runs over a realistic date-partitioned tree.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use chrono::{Duration, Utc};

use pastesift::archive::ArchiveManager;
use pastesift::config::{ArchiveConfig, DecoderConfig, PathsConfig};
use pastesift::core::paste::partition_path;

const EXE_MAGIC: &[u8] =
    b"MZ\x90\x00\x03\x00\x00\x00\x04\x00\x00\x00\xff\xff\x00\x00fake executable body";

fn manager(root: &Path, malware_root: &Path) -> ArchiveManager {
    let paths = PathsConfig {
        paste_root: root.to_path_buf(),
        artifact_dir: root.join("recovered"),
        malware_root: malware_root.to_path_buf(),
    };
    ArchiveManager::new(paths, ArchiveConfig::default(), &DecoderConfig::default())
}

fn listing(path: &Path) -> Result<Vec<String>> {
    let archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    Ok(names)
}

#[test]
fn run_archives_closed_partitions_and_spares_open_ones() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("pastes");
    let today = Utc::now().date_naive();

    // A long-closed partition with two landed pastes.
    let closed = partition_path(&root, today - Duration::days(30));
    fs::create_dir_all(&closed)?;
    fs::write(closed.join("old-a"), b"first body")?;
    fs::write(closed.join("old-b"), EXE_MAGIC)?;

    // Today's partition is still receiving writes.
    let open = partition_path(&root, today);
    fs::create_dir_all(&open)?;
    fs::write(open.join("fresh"), b"still landing")?;

    let malware_root = tmp.path().join("malware");
    let report = manager(&root, &malware_root).run()?;

    // The closed partition was consolidated and reaped.
    let day_name = closed.file_name().unwrap().to_string_lossy().into_owned();
    let archive_path = closed.join(format!("{}.zip", day_name));
    assert_eq!(listing(&archive_path)?, vec!["old-a", "old-b"]);
    assert!(!closed.join("old-a").exists());
    assert!(!closed.join("old-b").exists());

    // Today's partition was not touched.
    assert!(open.join("fresh").exists());
    assert!(!open.join("fresh.zip").exists());

    // The executable paste reached the malware sub-archive.
    let malware_path = malware_root.join(format!("{}.zip", day_name));
    assert_eq!(listing(&malware_path)?, vec!["old-b"]);
    let mut archive = zip::ZipArchive::new(File::open(&malware_path)?)?;
    let mut content = Vec::new();
    archive.by_name("old-b")?.read_to_end(&mut content)?;
    assert_eq!(content, EXE_MAGIC);

    assert_eq!(report.total_extracted(), 1);
    assert!(report
        .directories
        .iter()
        .any(|d| d.appended == 2 && d.reaped == 2 && d.extracted == 1));
    Ok(())
}

#[test]
fn rerun_adds_nothing_and_submits_nothing() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().join("pastes");
    let today = Utc::now().date_naive();
    let closed = partition_path(&root, today - Duration::days(10));
    fs::create_dir_all(&closed)?;
    fs::write(closed.join("only"), EXE_MAGIC)?;

    let malware_root = tmp.path().join("malware");
    let mgr = manager(&root, &malware_root);
    let first = mgr.run()?;
    assert_eq!(first.total_extracted(), 1);

    let second = mgr.run()?;
    assert_eq!(second.total_extracted(), 0);
    assert!(second.directories.iter().all(|d| !d.submitted));

    // New files landing later are picked up by the next pass.
    fs::write(closed.join("late"), b"straggler")?;
    let third = mgr.run()?;
    assert!(third.directories.iter().any(|d| d.appended == 1));
    assert!(!closed.join("late").exists());
    Ok(())
}

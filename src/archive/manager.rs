//! Per-directory archive consolidation with delete safety.
//!
//! Each leaf directory is processed in four strictly ordered phases:
//! append loose files into the directory's zip, reopen it and read the
//! central directory it reports, delete only the loose files that listing
//! confirms, then extract allow-listed payloads into the malware
//! sub-archive. The write-then-reopen split is the safety gate: deletion
//! trusts the archive format's own durable index, never the writer's
//! in-memory view of what it believes it wrote.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::{ArchiveConfig, DecoderConfig, PathsConfig};
use crate::core::report::{ArchiveRunReport, DirectoryReport};
use crate::decode::{InferSniffer, LayeredDecoder, TypePolicy};
use crate::error::Result;

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Read the durable entry listing of an existing archive.
fn archive_listing(path: &Path) -> Result<HashSet<String>> {
    let archive = ZipArchive::new(File::open(path)?)?;
    Ok(archive.file_names().map(|name| name.to_string()).collect())
}

/// Loose regular files in `dir` eligible for archiving: not directories,
/// not archives themselves.
fn loose_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list directory");
            return Vec::new();
        }
    };
    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            if name.ends_with(".zip") {
                return None;
            }
            let path = e.path();
            Some((name, path))
        })
        .collect();
    files.sort();
    files
}

pub struct ArchiveManager {
    paths: PathsConfig,
    cfg: ArchiveConfig,
    decoder: LayeredDecoder,
    http: reqwest::blocking::Client,
}

impl ArchiveManager {
    pub fn new(paths: PathsConfig, cfg: ArchiveConfig, decoder_cfg: &DecoderConfig) -> Self {
        let policy = TypePolicy::prefixes(
            cfg.extract_allow_prefixes.clone(),
            cfg.extract_deny_types.clone(),
        );
        let decoder = LayeredDecoder::with_sniffer(Box::new(InferSniffer), policy, decoder_cfg);
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            paths,
            cfg,
            decoder,
            http,
        }
    }

    /// Archive every eligible leaf directory under the paste root.
    /// Per-directory failures are logged and do not stop the run.
    pub fn run(&self) -> Result<ArchiveRunReport> {
        let today = Utc::now().date_naive();
        let mut report = ArchiveRunReport::default();
        for dir in crate::archive::walk::eligible_leaf_dirs(&self.paths.paste_root, today) {
            match self.process_directory(&dir) {
                Ok(dir_report) => report.directories.push(dir_report),
                Err(err) => warn!(dir = %dir.display(), error = %err, "directory pass failed"),
            }
        }
        Ok(report)
    }

    /// Run the four phases over one leaf directory.
    pub fn process_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let archive_path = dir.join(format!("{}.zip", name));

        let mut report = DirectoryReport {
            directory: dir.display().to_string(),
            ..DirectoryReport::default()
        };

        // Phase 1: append. The writer is finished and dropped before any
        // later phase opens the archive.
        let (appended, skipped) = self.append_phase(dir, &archive_path)?;
        report.appended = appended;
        report.skipped = skipped;

        if !archive_path.exists() {
            debug!(dir = %dir.display(), "nothing to archive");
            return Ok(report);
        }

        // Phase 2: verify against the reopened archive's own listing.
        let listing = archive_listing(&archive_path)?;

        // Phase 3: reap only what the listing confirms durable.
        let (reaped, reap_skipped) = reap_phase(dir, &listing);
        report.reaped = reaped;
        report.skipped += reap_skipped;

        // Phase 4: extract allow-listed payloads into the malware
        // sub-archive and submit it when it grew.
        let malware_path = self.paths.malware_root.join(format!("{}.zip", name));
        report.extracted = self.extract_phase(&archive_path, &malware_path)?;
        if report.extracted > 0 {
            report.submitted = self.submit_malware_archive(&malware_path);
        }

        info!(
            dir = %dir.display(),
            appended = report.appended,
            reaped = report.reaped,
            extracted = report.extracted,
            "directory pass complete"
        );
        Ok(report)
    }

    /// Append loose files not already listed in the archive. Returns
    /// (appended, skipped); per-file failures are logged and skipped so
    /// one vanished file cannot abort the batch.
    fn append_phase(&self, dir: &Path, archive_path: &Path) -> Result<(usize, usize)> {
        let existing = if archive_path.exists() {
            archive_listing(archive_path)?
        } else {
            HashSet::new()
        };
        let pending: Vec<(String, PathBuf)> = loose_files(dir)
            .into_iter()
            .filter(|(name, _)| !existing.contains(name))
            .collect();
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let mut writer = if archive_path.exists() {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(archive_path)?;
            ZipWriter::new_append(file)?
        } else {
            ZipWriter::new(File::create(archive_path)?)
        };

        let mut appended = 0;
        let mut skipped = 0;
        for (name, path) in pending {
            match append_one(&mut writer, &name, &path) {
                Ok(()) => appended += 1,
                Err(err) => {
                    warn!(entry = %name, error = %err, "error writing entry");
                    skipped += 1;
                }
            }
        }
        writer.finish()?;
        Ok((appended, skipped))
    }

    /// Classify each consolidated entry not yet in the malware sub-archive
    /// and append the recovered payloads. Returns the number of entries
    /// added; re-running over an unchanged archive adds nothing.
    fn extract_phase(&self, archive_path: &Path, malware_path: &Path) -> Result<usize> {
        let existing = if malware_path.exists() {
            archive_listing(malware_path)?
        } else {
            HashSet::new()
        };

        let mut archive = ZipArchive::new(File::open(archive_path)?)?;
        let mut recovered: Vec<(String, Vec<u8>)> = Vec::new();
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(index, error = %err, "unreadable archive entry");
                    continue;
                }
            };
            let name = entry.name().to_string();
            if existing.contains(&name) {
                continue;
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            if let Err(err) = entry.read_to_end(&mut content) {
                warn!(entry = %name, error = %err, "error reading archive entry");
                continue;
            }
            if let Some(attempt) = self.decoder.analyze(&content).into_iter().next() {
                debug!(entry = %name, mime = %attempt.detected_type, "payload extracted");
                recovered.push((name, attempt.payload));
            }
        }
        if recovered.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = malware_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = if malware_path.exists() {
            let file = OpenOptions::new().read(true).write(true).open(malware_path)?;
            ZipWriter::new_append(file)?
        } else {
            ZipWriter::new(File::create(malware_path)?)
        };
        let mut added = 0;
        for (name, payload) in recovered {
            match write_entry(&mut writer, &name, &payload) {
                Ok(()) => added += 1,
                Err(err) => warn!(entry = %name, error = %err, "error writing malware entry"),
            }
        }
        writer.finish()?;
        Ok(added)
    }

    /// Submit the malware sub-archive location to the external archiver.
    /// Non-2xx and transport failures are logged, never retried.
    fn submit_malware_archive(&self, malware_path: &Path) -> bool {
        if self.cfg.archiver_url.is_empty() {
            debug!("archiver submission disabled");
            return false;
        }
        let payload = serde_json::json!({
            "path": malware_path.display().to_string(),
            "passphrase": self.cfg.passphrase,
            "source": self.cfg.source_tag,
        });
        match self
            .http
            .post(&self.cfg.archiver_url)
            .bearer_auth(&self.cfg.archiver_token)
            .json(&payload)
            .send()
        {
            Ok(response) if response.status().is_success() => {
                info!(path = %malware_path.display(), "malware archive submitted");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "archiver rejected submission");
                false
            }
            Err(err) => {
                warn!(error = %err, "archiver submission failed");
                false
            }
        }
    }
}

fn append_one(writer: &mut ZipWriter<File>, name: &str, path: &Path) -> Result<()> {
    // Read first: a vanished file fails here, before the entry opens.
    let content = fs::read(path)?;
    write_entry(writer, name, &content)
}

fn write_entry(writer: &mut ZipWriter<File>, name: &str, content: &[u8]) -> Result<()> {
    writer.start_file(name, file_options())?;
    writer.write_all(content)?;
    Ok(())
}

/// Delete loose files confirmed by the verified listing; leave the rest
/// for the next pass. Returns (reaped, skipped).
fn reap_phase(dir: &Path, listing: &HashSet<String>) -> (usize, usize) {
    let mut reaped = 0;
    let mut skipped = 0;
    for (name, path) in loose_files(dir) {
        if !listing.contains(&name) {
            debug!(entry = %name, "not in durable listing, retained");
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => reaped += 1,
            Err(err) => {
                warn!(entry = %name, error = %err, "error deleting entry");
                skipped += 1;
            }
        }
    }
    (reaped, skipped)
}

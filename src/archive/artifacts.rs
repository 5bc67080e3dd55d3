//! Flat-directory storage for payloads recovered by the discovery engine.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::attempt::DecodeAttempt;
use crate::error::Result;

/// Derive a filename extension from a detected mime type: the first known
/// reverse mapping, else the mime with `/` flattened to `-`.
fn extension_for(mime: &str) -> String {
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| mime.replace('/', "-"))
}

/// Writes recovered payloads as `{paste-key}.{type-derived-extension}`.
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one recovered payload. Re-writing the same key and type is
    /// an idempotent overwrite.
    pub fn write(&self, key: &str, attempt: &DecodeAttempt) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}.{}", key, extension_for(&attempt.detected_type)));
        fs::write(&path, &attempt.payload)?;
        info!(
            key,
            mime = %attempt.detected_type,
            path = %path.display(),
            bytes = attempt.payload.len(),
            "recovered payload persisted"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(mime: &str, payload: &[u8]) -> DecodeAttempt {
        DecodeAttempt {
            encoding_chain: vec![],
            compression_chain: vec![],
            xor_key: None,
            detected_type: mime.to_string(),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("recovered"));
        let path = writer
            .write("Ab3dE9", &attempt("application/zip", b"PK\x03\x04data"))
            .unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04data");
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "Ab3dE9.zip");
    }

    #[test]
    fn test_unknown_mime_flattens() {
        assert_eq!(
            extension_for("application/x-dosexec"),
            "application-x-dosexec"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let a = attempt("application/zip", b"one");
        let first = writer.write("k", &a).unwrap();
        let second = writer.write("k", &a).unwrap();
        assert_eq!(first, second);
    }
}

//! Paste records and the date-partitioned tree they land in.
//!
//! Records are written by the external scraper, one JSON file per paste
//! under `root/year/month/day/key`. Partition components are not
//! zero-padded; `2024/3/7` is March 7th. Records are immutable once landed
//! and read-only inputs here.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

/// One harvested paste, as landed on disk by the scraper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasteRecord {
    /// Unique paste id; doubles as the on-disk filename.
    pub key: String,
    /// Paste content. Raw pastes that failed UTF-8 decoding are landed
    /// base64-armored by the scraper and come through here unchanged.
    pub body: String,
    /// Unix timestamp reported by the source, when available.
    #[serde(default)]
    pub date: Option<i64>,
    /// Source tag, e.g. "pastebin".
    #[serde(default)]
    pub source: Option<String>,
}

impl PasteRecord {
    /// Parse a landed record from its JSON file contents.
    pub fn from_json(raw: &str) -> Result<Self> {
        let record: PasteRecord = serde_json::from_str(raw)?;
        if record.key.is_empty() {
            return Err(SiftError::InvalidRecord("empty key".to_string()));
        }
        Ok(record)
    }

    /// Body bytes as evaluated by the filter and decoder.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }
}

/// A paste that passed the entropy filter and awaits decode analysis.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: String,
    pub entropy: f64,
    pub body: Vec<u8>,
}

/// The partition directory for one day: `root/year/month/day`.
pub fn partition_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.year().to_string())
        .join(date.month().to_string())
        .join(date.day().to_string())
}

/// The partition date `age_days` before today (UTC). Age 1 is yesterday,
/// the default analysis window once a partition stops receiving writes.
pub fn target_date(age_days: i64) -> NaiveDate {
    (Utc::now() - Duration::days(age_days)).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let raw = r#"{"key": "Ab3dE9", "body": "hello", "date": 1710000000, "source": "pastebin", "scrape_url": "ignored"}"#;
        let record = PasteRecord::from_json(raw).unwrap();
        assert_eq!(record.key, "Ab3dE9");
        assert_eq!(record.body_bytes(), b"hello");
        assert_eq!(record.source.as_deref(), Some("pastebin"));
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        let raw = r#"{"key": "", "body": "hello"}"#;
        assert!(PasteRecord::from_json(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_body() {
        let raw = r#"{"key": "Ab3dE9"}"#;
        assert!(PasteRecord::from_json(raw).is_err());
    }

    #[test]
    fn test_partition_path_unpadded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let path = partition_path(Path::new("/data/pastes"), date);
        assert_eq!(path, PathBuf::from("/data/pastes/2024/3/7"));
    }

    #[test]
    fn test_target_date_moves_backwards() {
        let today = Utc::now().date_naive();
        assert_eq!(target_date(0), today);
        assert!(target_date(1) < today);
    }
}

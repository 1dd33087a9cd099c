//! Pre-mutation record snapshots
//!
//! Every mutating or deleting call is preceded by writing the record's
//! current body to disk: one JSON file per (record id, timestamp) under
//! a directory named for the record id. Snapshots are write-once and
//! never modified after the fact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;

use crate::core::error::FolioError;

pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `body` for `record_id`. Returns the path written.
    pub fn write(&self, record_id: &str, body: &Value) -> Result<PathBuf, FolioError> {
        let record_dir = self.dir.join(record_id);
        fs::create_dir_all(&record_dir).map_err(|source| FolioError::Backup {
            record_id: record_id.to_string(),
            source,
        })?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        // Two snapshots of one record in the same millisecond get a
        // counter suffix rather than clobbering each other.
        for attempt in 0..100u32 {
            let name = if attempt == 0 {
                format!("{}.json", stamp)
            } else {
                format!("{}-{}.json", stamp, attempt)
            };
            let path = record_dir.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    serde_json::to_writer_pretty(&file, body).map_err(|e| {
                        FolioError::Backup {
                            record_id: record_id.to_string(),
                            source: std::io::Error::other(e),
                        }
                    })?;
                    tracing::debug!(record = record_id, path = %path.display(), "backed up");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(FolioError::Backup {
                        record_id: record_id.to_string(),
                        source,
                    })
                }
            }
        }
        Err(FolioError::Backup {
            record_id: record_id.to_string(),
            source: std::io::Error::other("could not find a free snapshot name"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_backup_writes_verbatim_body_under_record_dir() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path());
        let body = json!({"id": "i-1", "barcode": "350470", "status": {"name": "Available"}});

        let path = store.write("i-1", &body).unwrap();
        assert!(path.starts_with(tmp.path().join("i-1")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));

        let read_back: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back, body);
    }

    #[test]
    fn test_repeated_backups_never_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = BackupStore::new(tmp.path());

        let first = store.write("i-1", &json!({"rev": 1})).unwrap();
        let second = store.write("i-1", &json!({"rev": 2})).unwrap();
        assert_ne!(first, second);

        let first_body: Value =
            serde_json::from_str(&std::fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(first_body, json!({"rev": 1}));
    }

    #[test]
    fn test_backup_failure_reports_record_id() {
        // A file where the store expects a directory.
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("i-1"), b"in the way").unwrap();
        let store = BackupStore::new(tmp.path());

        let err = store.write("i-1", &json!({})).unwrap_err();
        match err {
            FolioError::Backup { record_id, .. } => assert_eq!(record_id, "i-1"),
            other => panic!("unexpected error: {}", other),
        }
    }
}

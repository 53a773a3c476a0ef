//! Append-only, optionally tamper-evident audit log.
//!
//! Each record is serialized to a canonical single-line JSON object with
//! deterministically sorted keys; when tamper detection is enabled a
//! truncated HMAC-SHA-256 checksum is appended after a `|` separator. The
//! log rotates by size, shifting `.1..N` files, and can later be walked to
//! verify that no line was altered after it was written.

mod config;
mod error;
mod record;
mod tamper;

pub use config::AuditConfig;
pub use error::AuditError;
pub use record::AuditRecord;

use relay_core::now_epoch_secs;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

struct Inner {
    file: File,
    bytes_written: u64,
}

/// An append-only audit sink. Cheap to clone-share via `Arc` (not `Clone`
/// itself, since the open file handle and byte counter are exclusive
/// state); construct one per logically distinct sink (policy decisions,
/// forensic/admin events) rather than sharing a single instance.
pub struct AuditLog {
    config: AuditConfig,
    tamper_key: [u8; 32],
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    Verified,
    Tampered,
    Disabled,
    Error,
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub valid_count: u64,
    pub invalid_count: u64,
}

impl AuditLog {
    pub fn open(config: AuditConfig) -> Result<Self, AuditError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::Open {
                    path: config.path.display().to_string(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|source| AuditError::Open {
                path: config.path.display().to_string(),
                source,
            })?;
        let bytes_written = file.metadata().map(|m| m.len()).unwrap_or(0);

        let instance_id = Uuid::new_v4().to_string();
        let tamper_key = tamper::derive_tamper_key(
            std::process::id(),
            now_epoch_secs(),
            &instance_id,
        );

        tracing::info!(path = %config.path.display(), "audit log opened");

        Ok(Self {
            config,
            tamper_key,
            inner: Mutex::new(Inner {
                file,
                bytes_written,
            }),
        })
    }

    /// Serializes and appends `record`, rotating first if the active file
    /// already exceeds `max_size_bytes`. Writes are serialized by a single
    /// mutex, matching the single-writer discipline every mutating audit
    /// path requires.
    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&record.to_canonical_value())?;
        if self.config.tamper_detection {
            let checksum = tamper::checksum_hex16(&self.tamper_key, &line);
            line.push('|');
            line.push_str(&checksum);
        }
        line.push('\n');

        // `std::sync::Mutex` is poisoned on panic only; a writer thread
        // panicking mid-write is not a recoverable scenario here.
        #[allow(clippy::unwrap_used)]
        let mut guard = self.inner.lock().unwrap();

        if guard.bytes_written > 0 && guard.bytes_written + line.len() as u64 > self.config.max_size_bytes {
            self.rotate_locked(&mut guard)?;
        }

        guard.file.write_all(line.as_bytes()).map_err(AuditError::Write)?;
        guard.bytes_written += line.len() as u64;
        Ok(())
    }

    /// Returns up to `limit` of the most recent records in the active
    /// file, oldest first, with the tamper checksum stripped. Does not
    /// inspect rotated files; a caller after more history should walk
    /// `.1..N` itself.
    pub fn tail(&self, limit: usize) -> Result<Vec<serde_json::Value>, AuditError> {
        let file = File::open(&self.config.path).map_err(AuditError::Read)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(AuditError::Read)?;
            if line.is_empty() {
                continue;
            }
            let body = match line.rsplit_once('|') {
                Some((body, _checksum)) if self.config.tamper_detection => body,
                _ => line.as_str(),
            };
            if let Ok(value) = serde_json::from_str(body) {
                lines.push(value);
            }
        }
        let start = lines.len().saturating_sub(limit);
        Ok(lines.split_off(start))
    }

    fn rotate_locked(&self, guard: &mut Inner) -> Result<(), AuditError> {
        guard.file.flush().map_err(AuditError::Rotate)?;

        let count = self.config.rotation_count;
        for i in (1..count).rev() {
            let from = rotated_path(&self.config.path, i);
            let to = rotated_path(&self.config.path, i + 1);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }
        if count >= 1 {
            let to = rotated_path(&self.config.path, 1);
            std::fs::rename(&self.config.path, &to).map_err(AuditError::Rotate)?;
        }

        let fresh = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)
            .map_err(AuditError::Rotate)?;
        guard.file = fresh;
        guard.bytes_written = 0;
        tracing::info!(path = %self.config.path.display(), "audit log rotated");
        Ok(())
    }

    /// Walks the active file line by line, splitting each on the last `|`
    /// and recomputing the checksum. Does not inspect rotated files.
    pub fn verify_integrity(&self) -> IntegrityReport {
        if !self.config.tamper_detection {
            return IntegrityReport {
                status: IntegrityStatus::Disabled,
                valid_count: 0,
                invalid_count: 0,
            };
        }

        let file = match File::open(&self.config.path) {
            Ok(f) => f,
            Err(_) => {
                return IntegrityReport {
                    status: IntegrityStatus::Error,
                    valid_count: 0,
                    invalid_count: 0,
                };
            }
        };

        let mut valid_count = 0u64;
        let mut invalid_count = 0u64;
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else {
                invalid_count += 1;
                continue;
            };
            if line.is_empty() {
                continue;
            }
            match line.rsplit_once('|') {
                Some((body, checksum)) => {
                    let expected = tamper::checksum_hex16(&self.tamper_key, body);
                    if expected == checksum {
                        valid_count += 1;
                    } else {
                        invalid_count += 1;
                    }
                }
                None => invalid_count += 1,
            }
        }

        let status = if invalid_count == 0 {
            IntegrityStatus::Verified
        } else {
            IntegrityStatus::Tampered
        };
        IntegrityReport {
            status,
            valid_count,
            invalid_count,
        }
    }
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(format!(".{index}"));
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_and_verify_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let log = AuditLog::open(AuditConfig::new(&path)).expect("open");

        for i in 0..5 {
            let record = AuditRecord::new(1_700_000_000 + i)
                .with_action("allow")
                .with_risk(80);
            log.append(&record).expect("append");
        }

        let report = log.verify_integrity();
        assert_eq!(report.status, IntegrityStatus::Verified);
        assert_eq!(report.valid_count, 5);
        assert_eq!(report.invalid_count, 0);
    }

    #[test]
    fn tampering_is_detected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let log = AuditLog::open(AuditConfig::new(&path)).expect("open");
        log.append(&AuditRecord::new(1_700_000_000).with_action("allow"))
            .expect("append");

        let contents = std::fs::read_to_string(&path).expect("read");
        let tampered = contents.replace("allow", "block");
        std::fs::write(&path, tampered).expect("write");

        let report = log.verify_integrity();
        assert_eq!(report.status, IntegrityStatus::Tampered);
        assert_eq!(report.invalid_count, 1);
    }

    #[test]
    fn disabled_tamper_detection_reports_disabled() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let mut config = AuditConfig::new(&path);
        config.tamper_detection = false;
        let log = AuditLog::open(config).expect("open");
        log.append(&AuditRecord::new(1_700_000_000)).expect("append");
        let report = log.verify_integrity();
        assert_eq!(report.status, IntegrityStatus::Disabled);
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let mut config = AuditConfig::new(&path);
        config.max_size_bytes = 1;
        config.rotation_count = 2;
        let log = AuditLog::open(config).expect("open");

        log.append(&AuditRecord::new(1).with_action("a")).expect("append");
        log.append(&AuditRecord::new(2).with_action("b")).expect("append");
        log.append(&AuditRecord::new(3).with_action("c")).expect("append");

        assert!(path.with_extension("log.1").exists() || rotated_path(&path, 1).exists());
    }
}

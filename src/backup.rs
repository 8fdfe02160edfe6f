use crate::error::{IniError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use std::fs;
use std::time::SystemTime;

/// Timestamp format embedded in backup filenames, second resolution.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Default number of backups kept per file.
const DEFAULT_MAX_BACKUPS: usize = 10;

/// A timestamped, checksummed snapshot of a settings file.
///
/// The checksum must equal the SHA-256 of the bytes at `file_path` for
/// the backup to be considered valid; any mismatch means corruption.
#[derive(Debug, Clone, PartialEq)]
pub struct Backup {
    pub timestamp: NaiveDateTime,
    pub file_path: Utf8PathBuf,
    pub original_path: Utf8PathBuf,
    pub file_size: u64,
    pub checksum: String,
    /// Freeform reason tag (e.g. "preset_applied:high_performance").
    pub created_by: Option<String>,
}

/// Manager for settings-file backups.
///
/// Operates purely on file bytes; it knows nothing about the parameter
/// model. Backups live beside the original file, named
/// `<name>.backup.<YYYYMMDD_HHMMSS>`, and retention is bounded: creating
/// a backup immediately evicts the oldest ones beyond `max_backups`.
#[derive(Debug, Clone)]
pub struct BackupManager {
    max_backups: usize,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BACKUPS)
    }
}

impl BackupManager {
    pub fn new(max_backups: usize) -> Self {
        Self { max_backups }
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Create a timestamped backup of `ini_path`.
    ///
    /// If another backup already claimed this second, a numeric suffix is
    /// appended so no snapshot is ever overwritten. Creation triggers
    /// retention cleanup as a side effect.
    ///
    /// # Errors
    /// [`IniError::FileNotFound`] if `ini_path` does not exist.
    pub fn create_backup(&self, ini_path: &Utf8Path, reason: Option<&str>) -> Result<Backup> {
        if !ini_path.exists() {
            return Err(IniError::FileNotFound(ini_path.to_path_buf()));
        }

        let parent = ini_path
            .parent()
            .unwrap_or_else(|| Utf8Path::new("."))
            .to_path_buf();
        let file_name = ini_path.file_name().unwrap_or("settings.ini");

        let timestamp = chrono::Local::now().naive_local();
        let timestamp_str = timestamp.format(TIMESTAMP_FORMAT).to_string();

        let mut backup_path = parent.join(format!("{file_name}.backup.{timestamp_str}"));
        let mut counter = 2;
        while backup_path.exists() {
            backup_path = parent.join(format!("{file_name}.backup.{timestamp_str}_{counter}"));
            counter += 1;
        }

        fs::copy(ini_path, &backup_path)?;

        let checksum = calculate_checksum(&backup_path)?;
        let file_size = fs::metadata(backup_path.as_std_path())?.len();

        let backup = Backup {
            timestamp,
            file_path: backup_path,
            original_path: ini_path.to_path_buf(),
            file_size,
            checksum,
            created_by: reason.map(str::to_string),
        };

        tracing::info!(
            "Created backup {} ({} bytes{})",
            backup.file_path,
            backup.file_size,
            reason.map(|r| format!(", reason: {r}")).unwrap_or_default()
        );

        // Creation and eviction are coupled; no separate scheduler.
        self.cleanup_old_backups(ini_path)?;

        Ok(backup)
    }

    /// List all backups for `ini_path`, newest first.
    ///
    /// Files in the same directory whose names do not match the backup
    /// pattern are silently skipped.
    pub fn list_backups(&self, ini_path: &Utf8Path) -> Result<Vec<Backup>> {
        let parent = ini_path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let file_name = ini_path.file_name().unwrap_or("settings.ini");
        let prefix = format!("{file_name}.backup.");

        if !parent.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<(SystemTime, Utf8PathBuf, NaiveDateTime, u64)> = Vec::new();
        for entry in fs::read_dir(parent.as_std_path())? {
            let entry = entry?;
            let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            let Some(stamp_part) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(timestamp) = parse_timestamp(stamp_part) else {
                continue;
            };

            let metadata = entry.metadata()?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, path, timestamp, metadata.len()));
        }

        // Newest first; the filename breaks mtime ties (the collision
        // suffix sorts after the bare timestamp).
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let mut backups = Vec::with_capacity(entries.len());
        for (_, path, timestamp, file_size) in entries {
            let checksum = calculate_checksum(&path)?;
            backups.push(Backup {
                timestamp,
                file_path: path,
                original_path: ini_path.to_path_buf(),
                file_size,
                checksum,
                created_by: None, // Not stored in the filename
            });
        }

        Ok(backups)
    }

    /// Verify backup integrity by recomputing its checksum.
    ///
    /// A missing file is "not verified", not an error. Verification is
    /// re-evaluated on every call, never cached.
    pub fn verify_backup(&self, backup: &Backup) -> bool {
        if !backup.file_path.exists() {
            return false;
        }
        match calculate_checksum(&backup.file_path) {
            Ok(checksum) => checksum == backup.checksum,
            Err(_) => false,
        }
    }

    /// Restore the original file from a backup.
    ///
    /// Takes a fresh safety backup of the current live file (reason
    /// "before_restore") before overwriting it. The live file is left
    /// untouched on any failure.
    ///
    /// # Errors
    /// - [`IniError::FileNotFound`] if the backup file is gone
    /// - [`IniError::ChecksumMismatch`] if the backup fails verification
    pub fn restore_backup(&self, backup: &Backup) -> Result<Utf8PathBuf> {
        if !backup.file_path.exists() {
            return Err(IniError::FileNotFound(backup.file_path.clone()));
        }

        if !self.verify_backup(backup) {
            return Err(IniError::ChecksumMismatch(backup.file_path.clone()));
        }

        if backup.original_path.exists() {
            self.create_backup(&backup.original_path, Some("before_restore"))?;
        }

        fs::copy(&backup.file_path, &backup.original_path)?;

        tracing::info!("Restored {} from {}", backup.original_path, backup.file_path);
        Ok(backup.original_path.clone())
    }

    /// Delete a single backup file.
    ///
    /// Returns false if the file was already gone.
    pub fn delete_backup(&self, backup: &Backup) -> bool {
        match fs::remove_file(&backup.file_path) {
            Ok(()) => true,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to delete backup {}: {}", backup.file_path, e);
                }
                false
            }
        }
    }

    /// Evict the oldest backups beyond `max_backups`.
    ///
    /// Returns the number of backups deleted.
    pub fn cleanup_old_backups(&self, ini_path: &Utf8Path) -> Result<usize> {
        let backups = self.list_backups(ini_path)?;

        if backups.len() <= self.max_backups {
            return Ok(0);
        }

        let mut deleted = 0;
        for backup in &backups[self.max_backups..] {
            if self.delete_backup(backup) {
                deleted += 1;
            }
        }

        if deleted > 0 {
            tracing::debug!("Evicted {} old backup(s) of {}", deleted, ini_path);
        }
        Ok(deleted)
    }
}

/// Parse the timestamp portion of a backup filename, tolerating the
/// numeric collision suffix (`<stamp>` or `<stamp>_<n>`).
fn parse_timestamp(stamp_part: &str) -> Option<NaiveDateTime> {
    let (stamp, rest) = stamp_part.split_at_checked(15)?;
    if !rest.is_empty() {
        let digits = rest.strip_prefix('_')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// SHA-256 of a file's bytes, as 64 hex characters.
fn calculate_checksum(path: &Utf8Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

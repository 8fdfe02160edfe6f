use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur in the INI engine.
///
/// Only stop-the-operation conditions live here. Recoverable conditions
/// (coercion fallback, validation violations, preset key misses,
/// already-deleted backups) are returned as plain data instead.
#[derive(Error, Debug)]
pub enum IniError {
    #[error("File not found: {0}")]
    FileNotFound(Utf8PathBuf),

    #[error("Failed to decode file contents: {0}")]
    Decode(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Backup file is corrupted (checksum mismatch): {0}")]
    ChecksumMismatch(Utf8PathBuf),

    #[error("Failed to load rule table: {0}")]
    RuleTable(String),

    #[error("Preset store error: {0}")]
    PresetStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IniError>;

// maxini - Configuration persistence and validation engine for 3ds Max INI files
//
// This is a library crate: it exposes data and accepts commands, and draws
// nothing. Host UIs own rendering and user input.

pub mod backup;
pub mod codec;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod presets;
pub mod session;
pub mod validator;

// Re-export commonly used types for convenience
pub use backup::{Backup, BackupManager};
pub use error::IniError;
pub use models::{
    ParamCategory, ParamType, ParamValue, Parameter, RuleTable, Section, ValidationIssue,
    ValidationRule,
};
pub use parser::IniParser;
pub use presets::{Preset, PresetManager, PresetValue};
pub use session::EditSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

use crate::backup::BackupManager;
use crate::error::Result;
use crate::models::{Parameter, RuleTable, Section};
use crate::parser::{IniParser, coerce_value};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// An in-progress editing session over one INI file.
///
/// Holds the parameter set as last loaded from (or committed to) disk —
/// the baseline — plus a mutable working copy grouped by section, and
/// tracks exactly which `"section.key"` pairs currently differ from the
/// baseline. The working copy is string-valued; types are re-derived from
/// the baseline parameters when committing.
#[derive(Debug)]
pub struct EditSession {
    ini_path: Utf8PathBuf,
    parser: IniParser,
    backup_manager: BackupManager,

    /// Parameters as loaded; never mutated in place.
    baseline: Vec<Parameter>,
    baseline_sections: IndexMap<String, Section>,

    /// Mutable copy the UI edits.
    working: IndexMap<String, Section>,

    /// `"section.key"` identifiers whose working value differs from the
    /// baseline. Membership is recomputed on every mutation, so reverting
    /// a value to its original removes the key.
    modified: BTreeSet<String>,
}

impl EditSession {
    pub fn new<P: AsRef<Utf8Path>>(ini_path: P, rules: RuleTable) -> Self {
        Self {
            ini_path: ini_path.as_ref().to_path_buf(),
            parser: IniParser::new(rules),
            backup_manager: BackupManager::default(),
            baseline: Vec::new(),
            baseline_sections: IndexMap::new(),
            working: IndexMap::new(),
            modified: BTreeSet::new(),
        }
    }

    pub fn ini_path(&self) -> &Utf8Path {
        &self.ini_path
    }

    pub fn backup_manager(&self) -> &BackupManager {
        &self.backup_manager
    }

    /// Load the INI file into this session.
    ///
    /// Returns false on any parse failure, leaving prior session state
    /// untouched so a previously loaded file stays editable.
    pub fn load(&mut self) -> bool {
        let parameters = match self.parser.load(&self.ini_path) {
            Ok(parameters) => parameters,
            Err(e) => {
                tracing::error!("Failed to load {}: {}", self.ini_path, e);
                return false;
            }
        };

        self.baseline_sections = group_by_section(&parameters);
        self.working = self.baseline_sections.clone();
        self.baseline = parameters;
        self.modified.clear();
        true
    }

    /// Baseline parameters, as last synchronized with disk.
    pub fn parameters(&self) -> &[Parameter] {
        &self.baseline
    }

    /// Section names in file order.
    pub fn section_names(&self) -> Vec<&str> {
        self.working.keys().map(String::as_str).collect()
    }

    /// Current working-copy values for a section.
    pub fn section_parameters(&self, section: &str) -> Option<&IndexMap<String, String>> {
        self.working.get(section).map(|s| &s.parameters)
    }

    /// Update a parameter in the working copy.
    ///
    /// Membership in the modified set is recomputed against the baseline
    /// string value, so setting a value back to its original un-marks it.
    /// Unknown sections are ignored.
    pub fn update_parameter(&mut self, section: &str, key: &str, value: &str) {
        let Some(working_section) = self.working.get_mut(section) else {
            tracing::warn!("update_parameter: unknown section '{}'", section);
            return;
        };
        working_section.parameters.insert(key.to_string(), value.to_string());

        let baseline_value = self
            .baseline_sections
            .get(section)
            .and_then(|s| s.parameters.get(key))
            .map(String::as_str)
            .unwrap_or("");

        let param_id = format!("{section}.{key}");
        if value != baseline_value {
            self.modified.insert(param_id);
        } else {
            self.modified.remove(&param_id);
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }

    pub fn modified_keys(&self) -> &BTreeSet<String> {
        &self.modified
    }

    /// Discard every edit, restoring the working copy from the baseline.
    pub fn revert_all(&mut self) {
        self.working = self.baseline_sections.clone();
        self.modified.clear();
    }

    /// Discard edits in a single section only.
    pub fn revert_section(&mut self, section: &str) {
        let Some(baseline_section) = self.baseline_sections.get(section) else {
            return;
        };
        self.working
            .insert(section.to_string(), baseline_section.clone());

        let prefix = format!("{section}.");
        self.modified.retain(|id| !id.starts_with(&prefix));
    }

    /// Commit the working copy to disk.
    ///
    /// The commit is a full rewrite: every baseline parameter is emitted
    /// with its current working value (re-coerced to its declared type),
    /// so no key is ever silently dropped. Only after the bytes are on
    /// disk does the working copy become the new baseline and the
    /// modified set clear; any failure leaves edits intact for a retry.
    ///
    /// Validation is not run here — callers gate on
    /// [`crate::validator::validate`] first.
    pub fn save(&mut self, create_backup: bool) -> Result<()> {
        if create_backup {
            self.backup_manager
                .create_backup(&self.ini_path, Some("before_save"))?;
        }

        let rebuilt: Vec<Parameter> = self
            .baseline
            .iter()
            .map(|param| {
                let current = self
                    .working
                    .get(&param.section)
                    .and_then(|s| s.parameters.get(&param.key))
                    .cloned()
                    .unwrap_or_else(|| param.value.to_ini_string());

                let mut updated = param.clone();
                updated.value = coerce_value(&current, param.param_type);
                updated
            })
            .collect();

        self.parser.save(&self.ini_path, &rebuilt)?;

        self.baseline_sections = group_by_section(&rebuilt);
        self.working = self.baseline_sections.clone();
        self.baseline = rebuilt;
        self.modified.clear();

        tracing::info!("Saved {} to disk", self.ini_path);
        Ok(())
    }
}

/// Group parameters into string-valued sections, preserving file order.
fn group_by_section(parameters: &[Parameter]) -> IndexMap<String, Section> {
    let mut sections: IndexMap<String, Section> = IndexMap::new();
    for param in parameters {
        sections
            .entry(param.section.clone())
            .or_insert_with(|| Section::new(&param.section))
            .parameters
            .insert(param.key.clone(), param.value.to_ini_string());
    }
    sections
}

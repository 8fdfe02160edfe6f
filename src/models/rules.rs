use crate::error::{IniError, Result};
use crate::models::{ParamCategory, ParamType, ValidationRule};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;

/// One rule-table entry: declared type, category and validation constraints
/// for a single parameter key.
///
/// All fields are optional in the JSON source; absent fields fall back to
/// STRING / UI / unconstrained.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterRule {
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub category: ParamCategory,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub regex: Option<String>,
    #[serde(default)]
    pub must_exist: bool,
    pub allowed_values: Option<Vec<String>>,
    pub default: Option<String>,
    pub description_en: Option<String>,
    pub description_ru: Option<String>,
    pub unit: Option<String>,
}

impl ParameterRule {
    /// Build the validation constraints carried by this rule, if any.
    pub fn validation(&self) -> Option<ValidationRule> {
        let rule = ValidationRule {
            min_value: self.min,
            max_value: self.max,
            regex_pattern: self.regex.clone(),
            must_exist: self.must_exist,
            allowed_values: self.allowed_values.clone(),
        };
        if rule.is_empty() { None } else { Some(rule) }
    }
}

/// Read-only mapping of parameter key -> rule, loaded once at construction.
///
/// The table is external configuration (JSON); the engine never generates
/// or mutates it.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: IndexMap<String, ParameterRule>,
}

impl RuleTable {
    /// An empty table: every key parses as STRING / UI with no constraints.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the rule table from a JSON file.
    ///
    /// A missing file yields an empty table (the parser still works,
    /// everything is an unvalidated string). Malformed JSON is fatal.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Rule table not found at {}, using empty table", path);
            return Ok(Self::empty());
        }

        let contents = fs::read_to_string(path)?;
        let rules: IndexMap<String, ParameterRule> = serde_json::from_str(&contents)
            .map_err(|e| IniError::RuleTable(format!("{}: {}", path, e)))?;

        tracing::info!("Loaded {} parameter rules from {}", rules.len(), path);
        Ok(Self { rules })
    }

    pub fn from_rules(rules: IndexMap<String, ParameterRule>) -> Self {
        Self { rules }
    }

    /// Look up the rule for a key: exact match first, then case-insensitive.
    pub fn get(&self, key: &str) -> Option<&ParameterRule> {
        if let Some(rule) = self.rules.get(key) {
            return Some(rule);
        }
        self.rules
            .iter()
            .find(|(rule_key, _)| rule_key.eq_ignore_ascii_case(key))
            .map(|(_, rule)| rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

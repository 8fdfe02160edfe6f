use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Declared type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamType {
    #[default]
    String,
    Int,
    Bool,
    Path,
}

/// Coarse parameter grouping for UI organization.
///
/// `Ui` is the catch-all for keys without a rule-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamCategory {
    Rendering,
    Memory,
    Paths,
    #[default]
    Ui,
    Plugins,
    Network,
    Performance,
}

/// A parsed parameter value.
///
/// The variant tag matches the declared [`ParamType`] after parsing unless
/// coercion fell back to `Str` (a silent downgrade, never a parse error).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Path(Utf8PathBuf),
}

impl ParamValue {
    /// Render the value in its INI string form.
    ///
    /// Booleans round-trip as "1"/"0", the form 3ds Max writes.
    pub fn to_ini_string(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            ParamValue::Path(p) => p.to_string(),
        }
    }

    /// Whether the runtime tag matches the given declared type.
    pub fn matches_type(&self, param_type: ParamType) -> bool {
        matches!(
            (self, param_type),
            (ParamValue::Str(_), ParamType::String)
                | (ParamValue::Int(_), ParamType::Int)
                | (ParamValue::Bool(_), ParamType::Bool)
                | (ParamValue::Path(_), ParamType::Path)
        )
    }
}

/// Validation constraints for a parameter, sourced from the rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub regex_pattern: Option<String>,
    #[serde(default)]
    pub must_exist: bool,
    pub allowed_values: Option<Vec<String>>,
}

impl ValidationRule {
    /// True if no constraint is set at all.
    pub fn is_empty(&self) -> bool {
        self.min_value.is_none()
            && self.max_value.is_none()
            && self.regex_pattern.is_none()
            && !self.must_exist
            && self.allowed_values.is_none()
    }
}

/// A single parameter read from an INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub key: String,
    pub value: ParamValue,
    pub param_type: ParamType,
    pub category: ParamCategory,
    /// The literal section header this parameter was read from.
    pub section: String,
    pub description_ru: Option<String>,
    pub description_en: Option<String>,
    pub validation: Option<ValidationRule>,
    pub default_value: Option<String>,
    pub unit: Option<String>,
}

impl Parameter {
    /// Create a bare parameter with no rule-table metadata attached.
    pub fn new(section: &str, key: &str, value: ParamValue, param_type: ParamType) -> Self {
        Self {
            key: key.to_string(),
            value,
            param_type,
            category: ParamCategory::default(),
            section: section.to_string(),
            description_ru: None,
            description_en: None,
            validation: None,
            default_value: None,
            unit: None,
        }
    }
}

/// A single validation violation.
///
/// Violations are data, not control flow: the validator returns the
/// complete list so a caller can present every issue at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// A named group of key/value pairs, the working representation during an
/// edit session. Values are kept in string form to simplify diffing and UI
/// round-trips; type is re-derived from the baseline parameter on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub parameters: indexmap::IndexMap<String, String>,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: indexmap::IndexMap::new(),
        }
    }
}

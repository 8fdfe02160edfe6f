use crate::codec;
use crate::error::{IniError, Result};
use crate::models::{ParamCategory, ParamType, ParamValue, Parameter, RuleTable};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;

/// Values treated as `true` when coercing a BOOL parameter.
const BOOL_TRUE_VALUES: [&str; 4] = ["1", "yes", "true", "on"];

/// Parser for 3ds Max INI configuration files.
///
/// Turns decoded text into a flat list of typed [`Parameter`] records,
/// consulting the rule table for declared types, categories and
/// validation constraints. Unknown keys parse as STRING / UI.
#[derive(Debug, Clone, Default)]
pub struct IniParser {
    rules: RuleTable,
}

impl IniParser {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Load and parse an INI file.
    ///
    /// # Errors
    /// - [`IniError::FileNotFound`] if the path does not exist
    /// - [`IniError::Decode`] if the bytes are not UTF-16/UTF-8
    /// - [`IniError::Parse`] on malformed section structure
    ///
    /// Per-key type coercion failures are never fatal; the value silently
    /// keeps its raw string form.
    pub fn load(&self, path: &Utf8Path) -> Result<Vec<Parameter>> {
        if !path.exists() {
            return Err(IniError::FileNotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let content = codec::decode(&bytes)?;
        let parameters = self.parse_text(&content)?;

        tracing::info!("Parsed {} parameters from {}", parameters.len(), path);
        Ok(parameters)
    }

    /// Parse decoded INI text into parameters, in file order.
    ///
    /// Section order is preserved as first-seen; keys keep their original
    /// case (lookups elsewhere are case-insensitive).
    pub fn parse_text(&self, content: &str) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        let mut current_section: Option<String> = None;

        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            let line_number = index + 1;

            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    return Err(IniError::Parse {
                        line: line_number,
                        message: format!("unterminated section header: {raw_line}"),
                    });
                };
                current_section = Some(name.to_string());
                continue;
            }

            let Some(section) = &current_section else {
                return Err(IniError::Parse {
                    line: line_number,
                    message: format!("key/value pair before any section header: {raw_line}"),
                });
            };

            let Some((key, value)) = line.split_once('=') else {
                return Err(IniError::Parse {
                    line: line_number,
                    message: format!("expected key=value: {raw_line}"),
                });
            };

            parameters.push(self.build_parameter(section, key.trim(), value.trim()));
        }

        Ok(parameters)
    }

    /// Build one parameter, attaching rule-table metadata and coercing the
    /// raw value to its declared type.
    fn build_parameter(&self, section: &str, key: &str, raw_value: &str) -> Parameter {
        match self.rules.get(key) {
            Some(rule) => Parameter {
                key: key.to_string(),
                value: coerce_value(raw_value, rule.param_type),
                param_type: rule.param_type,
                category: rule.category,
                section: section.to_string(),
                description_ru: rule.description_ru.clone(),
                description_en: rule.description_en.clone(),
                validation: rule.validation(),
                default_value: rule.default.clone(),
                unit: rule.unit.clone(),
            },
            None => Parameter::new(
                section,
                key,
                ParamValue::Str(raw_value.to_string()),
                ParamType::String,
            ),
        }
    }

    /// Serialize parameters back into INI text.
    ///
    /// Parameters are grouped by section in first-seen order; keys keep
    /// their original order within each section.
    pub fn serialize(&self, parameters: &[Parameter]) -> String {
        let mut sections: IndexMap<&str, Vec<(&str, String)>> = IndexMap::new();
        for param in parameters {
            sections
                .entry(param.section.as_str())
                .or_default()
                .push((param.key.as_str(), param.value.to_ini_string()));
        }

        let mut out = String::new();
        for (name, entries) in &sections {
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in entries {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Save parameters to an INI file, normalized to UTF-16LE with BOM.
    pub fn save(&self, path: &Utf8Path, parameters: &[Parameter]) -> Result<()> {
        let content = self.serialize(parameters);
        let bytes = codec::encode(&content);
        fs::write(path, bytes)?;

        tracing::info!("Saved {} parameters to {}", parameters.len(), path);
        Ok(())
    }

    /// Find a parameter by key, case-insensitively.
    pub fn get_parameter<'a>(
        &self,
        parameters: &'a [Parameter],
        key: &str,
    ) -> Option<&'a Parameter> {
        parameters.iter().find(|p| p.key.eq_ignore_ascii_case(key))
    }

    /// Group parameters by category for UI display.
    pub fn group_by_category<'a>(
        &self,
        parameters: &'a [Parameter],
    ) -> IndexMap<ParamCategory, Vec<&'a Parameter>> {
        let mut grouped: IndexMap<ParamCategory, Vec<&Parameter>> = IndexMap::new();
        for param in parameters {
            grouped.entry(param.category).or_default().push(param);
        }
        grouped
    }
}

/// Coerce a raw string value to its declared type.
///
/// Pure and infallible: an INT that does not parse keeps the raw string
/// (the tag stays `Str`), a BOOL matches the true-set case-insensitively
/// and everything else is false, a PATH wraps the raw text without any
/// existence check (that is the validator's job).
pub fn coerce_value(raw: &str, param_type: ParamType) -> ParamValue {
    match param_type {
        ParamType::Int => match raw.parse::<i64>() {
            Ok(n) => ParamValue::Int(n),
            Err(_) => ParamValue::Str(raw.to_string()),
        },
        ParamType::Bool => ParamValue::Bool(
            BOOL_TRUE_VALUES
                .iter()
                .any(|v| raw.eq_ignore_ascii_case(v)),
        ),
        ParamType::Path => ParamValue::Path(Utf8PathBuf::from(raw)),
        ParamType::String => ParamValue::Str(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParameterRule;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    const SAMPLE_INI: &str = "[Rendering]\nRenderThreads=8\nAutoBackup=1\n\n\
                              [Memory]\nMemoryPool=512\n\n\
                              [Paths]\nProjectFolder=C:\\Projects\n";

    fn test_rules() -> RuleTable {
        let json = r#"{
            "RenderThreads": {"type": "INT", "min": 1, "max": 128, "category": "RENDERING"},
            "AutoBackup": {"type": "BOOL", "category": "RENDERING"},
            "MemoryPool": {"type": "INT", "min": 128, "max": 8192, "category": "MEMORY"},
            "ProjectFolder": {"type": "PATH", "category": "PATHS"}
        }"#;
        let rules: IndexMap<String, ParameterRule> = serde_json::from_str(json).unwrap();
        RuleTable::from_rules(rules)
    }

    #[test]
    fn test_parse_typed_values() {
        let parser = IniParser::new(test_rules());
        let params = parser.parse_text(SAMPLE_INI).unwrap();
        assert_eq!(params.len(), 4);

        let threads = parser.get_parameter(&params, "RenderThreads").unwrap();
        assert_eq!(threads.value, ParamValue::Int(8));
        assert_eq!(threads.param_type, ParamType::Int);
        assert_eq!(threads.category, ParamCategory::Rendering);
        assert_eq!(threads.section, "Rendering");

        let backup = parser.get_parameter(&params, "AutoBackup").unwrap();
        assert_eq!(backup.value, ParamValue::Bool(true));
    }

    #[test]
    fn test_unknown_key_defaults_to_string_ui() {
        let parser = IniParser::new(RuleTable::empty());
        let params = parser.parse_text("[A]\nMysteryKey=42\n").unwrap();
        assert_eq!(params[0].param_type, ParamType::String);
        assert_eq!(params[0].category, ParamCategory::Ui);
        assert_eq!(params[0].value, ParamValue::Str("42".to_string()));
        assert!(params[0].validation.is_none());
    }

    #[test]
    fn test_int_coercion_failure_keeps_string() {
        let parser = IniParser::new(test_rules());
        let params = parser.parse_text("[Rendering]\nRenderThreads=lots\n").unwrap();
        // Silent downgrade: the declared type stays INT, the tag falls back.
        assert_eq!(params[0].param_type, ParamType::Int);
        assert_eq!(params[0].value, ParamValue::Str("lots".to_string()));
    }

    #[test]
    fn test_bool_coercion_true_set() {
        for raw in ["1", "yes", "TRUE", "On"] {
            assert_eq!(coerce_value(raw, ParamType::Bool), ParamValue::Bool(true));
        }
        for raw in ["0", "no", "off", "anything"] {
            assert_eq!(coerce_value(raw, ParamType::Bool), ParamValue::Bool(false));
        }
    }

    #[test]
    fn test_unterminated_section_header_is_fatal() {
        let parser = IniParser::new(RuleTable::empty());
        let err = parser.parse_text("[Rendering\nRenderThreads=8\n").unwrap_err();
        assert!(matches!(err, IniError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_key_before_section_is_fatal() {
        let parser = IniParser::new(RuleTable::empty());
        let err = parser.parse_text("RenderThreads=8\n").unwrap_err();
        assert!(matches!(err, IniError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let parser = IniParser::new(RuleTable::empty());
        let err = parser.load(Utf8Path::new("no_such_file.ini")).unwrap_err();
        assert!(matches!(err, IniError::FileNotFound(_)));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("3dsMax.ini")).unwrap();

        let parser = IniParser::new(test_rules());
        let params = parser.parse_text(SAMPLE_INI).unwrap();
        parser.save(&path, &params).unwrap();

        // File is normalized to UTF-16LE with BOM.
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);

        let reloaded = parser.load(&path).unwrap();
        assert_eq!(reloaded.len(), params.len());
        for (a, b) in params.iter().zip(&reloaded) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.section, b.section);
            assert_eq!(a.value, b.value);
        }
    }

    #[test]
    fn test_section_order_preserved() {
        let parser = IniParser::new(RuleTable::empty());
        let params = parser
            .parse_text("[Zebra]\na=1\n[Alpha]\nb=2\n[Zebra]\nc=3\n")
            .unwrap();
        let text = parser.serialize(&params);
        let zebra = text.find("[Zebra]").unwrap();
        let alpha = text.find("[Alpha]").unwrap();
        assert!(zebra < alpha);
        // Late keys of an earlier section fold into its block.
        assert_eq!(text.matches("[Zebra]").count(), 1);
    }

    #[test]
    fn test_key_case_preserved() {
        let parser = IniParser::new(RuleTable::empty());
        let params = parser.parse_text("[A]\nRenderThreads=8\n").unwrap();
        assert_eq!(params[0].key, "RenderThreads");
    }

    #[test]
    fn test_group_by_category() {
        let parser = IniParser::new(test_rules());
        let params = parser.parse_text(SAMPLE_INI).unwrap();
        let grouped = parser.group_by_category(&params);
        assert_eq!(grouped[&ParamCategory::Rendering].len(), 2);
        assert_eq!(grouped[&ParamCategory::Memory].len(), 1);
    }
}

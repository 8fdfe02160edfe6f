use crate::models::{ParamType, ParamValue, Parameter, ValidationIssue};
use regex::Regex;

/// Check a list of parameters against their validation rules.
///
/// Every parameter is evaluated independently and every applicable rule
/// runs; the complete list of violations is returned so callers can
/// present all issues at once. An empty list means everything passed.
pub fn validate(parameters: &[Parameter]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for param in parameters {
        let Some(rule) = &param.validation else {
            continue;
        };

        // Declared INT whose coercion fell back to a raw string.
        if param.param_type == ParamType::Int && !matches!(param.value, ParamValue::Int(_)) {
            issues.push(ValidationIssue {
                key: param.key.clone(),
                message: format!(
                    "Must be an integer, got '{}'",
                    param.value.to_ini_string()
                ),
            });
        }

        if let ParamValue::Int(value) = param.value {
            if let Some(min) = rule.min_value {
                if value < min {
                    issues.push(ValidationIssue {
                        key: param.key.clone(),
                        message: format!("Value {value} is below minimum {min}"),
                    });
                }
            }
            if let Some(max) = rule.max_value {
                if value > max {
                    issues.push(ValidationIssue {
                        key: param.key.clone(),
                        message: format!("Value {value} is above maximum {max}"),
                    });
                }
            }
        }

        if param.param_type == ParamType::Path && rule.must_exist {
            if let ParamValue::Path(path) = &param.value {
                if !path.exists() {
                    issues.push(ValidationIssue {
                        key: param.key.clone(),
                        message: format!("Path does not exist: {path}"),
                    });
                }
            }
        }

        if let (Some(pattern), ParamValue::Str(value)) = (&rule.regex_pattern, &param.value) {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(value) {
                        issues.push(ValidationIssue {
                            key: param.key.clone(),
                            message: format!("Value '{value}' does not match pattern {pattern}"),
                        });
                    }
                }
                Err(e) => issues.push(ValidationIssue {
                    key: param.key.clone(),
                    message: format!("Invalid validation pattern {pattern}: {e}"),
                }),
            }
        }

        if let Some(allowed) = &rule.allowed_values {
            let value = param.value.to_ini_string();
            if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&value)) {
                issues.push(ValidationIssue {
                    key: param.key.clone(),
                    message: format!(
                        "Value '{}' is not one of: {}",
                        value,
                        allowed.join(", ")
                    ),
                });
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationRule;

    fn int_param(key: &str, value: ParamValue, min: i64, max: i64) -> Parameter {
        let mut param = Parameter::new("Rendering", key, value, ParamType::Int);
        param.validation = Some(ValidationRule {
            min_value: Some(min),
            max_value: Some(max),
            ..Default::default()
        });
        param
    }

    #[test]
    fn test_valid_parameter_passes() {
        let param = int_param("RenderThreads", ParamValue::Int(8), 1, 128);
        assert!(validate(&[param]).is_empty());
    }

    #[test]
    fn test_below_minimum() {
        let param = int_param("RenderThreads", ParamValue::Int(0), 1, 128);
        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("below minimum"));
    }

    #[test]
    fn test_above_maximum() {
        let param = int_param("RenderThreads", ParamValue::Int(256), 1, 128);
        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("above maximum"));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let param = int_param(
            "RenderThreads",
            ParamValue::Str("lots".to_string()),
            1,
            128,
        );
        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("integer"));
    }

    #[test]
    fn test_no_short_circuit_across_parameters() {
        let bad_range = int_param("RenderThreads", ParamValue::Int(0), 1, 128);
        let bad_type = int_param("MemoryPool", ParamValue::Str("big".to_string()), 128, 8192);
        let issues = validate(&[bad_range, bad_type]);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].key, "RenderThreads");
        assert_eq!(issues[1].key, "MemoryPool");
    }

    #[test]
    fn test_path_must_exist() {
        let mut param = Parameter::new(
            "Paths",
            "ProjectFolder",
            ParamValue::Path("Z:/definitely/not/here".into()),
            ParamType::Path,
        );
        param.validation = Some(ValidationRule {
            must_exist: true,
            ..Default::default()
        });

        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("does not exist"));
    }

    #[test]
    fn test_path_existing_passes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut param = Parameter::new(
            "Paths",
            "ProjectFolder",
            ParamValue::Path(
                camino::Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap(),
            ),
            ParamType::Path,
        );
        param.validation = Some(ValidationRule {
            must_exist: true,
            ..Default::default()
        });

        assert!(validate(&[param]).is_empty());
    }

    #[test]
    fn test_no_rule_means_no_issues() {
        let param = Parameter::new(
            "A",
            "FreeForm",
            ParamValue::Str("anything".to_string()),
            ParamType::String,
        );
        assert!(validate(&[param]).is_empty());
    }

    #[test]
    fn test_regex_pattern() {
        let mut param = Parameter::new(
            "Network",
            "ServerName",
            ParamValue::Str("render farm!".to_string()),
            ParamType::String,
        );
        param.validation = Some(ValidationRule {
            regex_pattern: Some("^[A-Za-z0-9_-]+$".to_string()),
            ..Default::default()
        });

        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("does not match"));
    }

    #[test]
    fn test_allowed_values() {
        let mut param = Parameter::new(
            "Rendering",
            "Renderer",
            ParamValue::Str("Mystery".to_string()),
            ParamType::String,
        );
        param.validation = Some(ValidationRule {
            allowed_values: Some(vec!["Arnold".to_string(), "Scanline".to_string()]),
            ..Default::default()
        });

        let issues = validate(&[param]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("not one of"));
    }

    #[test]
    fn test_multiple_issues_on_one_parameter() {
        // Type mismatch plus allowed-values miss: both must be reported.
        let mut param = Parameter::new(
            "Rendering",
            "RenderThreads",
            ParamValue::Str("lots".to_string()),
            ParamType::Int,
        );
        param.validation = Some(ValidationRule {
            min_value: Some(1),
            max_value: Some(128),
            allowed_values: Some(vec!["8".to_string(), "16".to_string()]),
            ..Default::default()
        });

        let issues = validate(&[param]);
        assert_eq!(issues.len(), 2);
    }
}

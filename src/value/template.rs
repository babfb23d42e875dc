//! Value template extraction
//!
//! Home Assistant discovery configs may carry a `value_template` that
//! extracts the interesting part of a raw payload before typed decoding,
//! e.g. `{{ value_json.TEMP }}` against a Tasmota telemetry blob. The bridge
//! supports the passthrough form and dotted `value_json` field access; any
//! other expression is kept verbatim and fails at decode time, never at
//! construction time, so one exotic template cannot block a whole device.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;

static PASSTHROUGH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*value\s*\}\}$").expect("static regex"));

static VALUE_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{\s*value_json\.([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}\}$")
        .expect("static regex")
});

/// Template application failure; surfaced to the caller as a decode error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("payload is not valid JSON, cannot apply '{template}'")]
    PayloadNotJson { template: String },

    #[error("field '{field}' not found while applying '{template}'")]
    FieldNotFound { template: String, field: String },

    #[error("field '{field}' is not a scalar value")]
    NotScalar { field: String },

    #[error("unsupported template expression '{0}'")]
    Unsupported(String),
}

/// A parsed `value_template` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTemplate {
    /// `{{ value }}` — raw payload used unchanged
    Passthrough,
    /// `{{ value_json.<dotted.path> }}` — extract a field from a JSON payload
    JsonField { path: Vec<String>, source: String },
    /// Anything else; kept so decode can report the exact expression
    Unsupported(String),
}

impl ValueTemplate {
    /// Parse a template expression. Never fails; unrecognized expressions
    /// become [`ValueTemplate::Unsupported`] and error per-message instead.
    pub fn parse(expr: &str) -> Self {
        let trimmed = expr.trim();
        if PASSTHROUGH_RE.is_match(trimmed) {
            return ValueTemplate::Passthrough;
        }
        if let Some(caps) = VALUE_JSON_RE.captures(trimmed) {
            let path = caps[1].split('.').map(str::to_string).collect();
            return ValueTemplate::JsonField {
                path,
                source: trimmed.to_string(),
            };
        }
        ValueTemplate::Unsupported(trimmed.to_string())
    }

    /// Apply the template to a raw (already UTF-8 validated) payload
    pub fn apply(&self, raw: &str) -> Result<String, TemplateError> {
        match self {
            ValueTemplate::Passthrough => Ok(raw.to_string()),
            ValueTemplate::JsonField { path, source } => {
                let parsed: JsonValue =
                    serde_json::from_str(raw).map_err(|_| TemplateError::PayloadNotJson {
                        template: source.clone(),
                    })?;

                let mut current = &parsed;
                for segment in path {
                    current =
                        current
                            .get(segment)
                            .ok_or_else(|| TemplateError::FieldNotFound {
                                template: source.clone(),
                                field: segment.clone(),
                            })?;
                }

                match current {
                    JsonValue::String(s) => Ok(s.clone()),
                    JsonValue::Number(n) => Ok(n.to_string()),
                    JsonValue::Bool(b) => Ok(b.to_string()),
                    _ => Err(TemplateError::NotScalar {
                        field: path.join("."),
                    }),
                }
            }
            ValueTemplate::Unsupported(expr) => Err(TemplateError::Unsupported(expr.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        let tpl = ValueTemplate::parse("{{ value }}");
        assert_eq!(tpl, ValueTemplate::Passthrough);
        assert_eq!(tpl.apply("21.5").unwrap(), "21.5");
    }

    #[test]
    fn test_json_field_extraction() {
        let tpl = ValueTemplate::parse("{{ value_json.TEMP }}");
        assert_eq!(tpl.apply(r#"{"TEMP": 21.5, "HUM": 40}"#).unwrap(), "21.5");
        assert_eq!(tpl.apply(r#"{"TEMP": "21.5"}"#).unwrap(), "21.5");
    }

    #[test]
    fn test_nested_json_field() {
        let tpl = ValueTemplate::parse("{{ value_json.AM2301.Temperature }}");
        let payload = r#"{"Time":"2024-01-01T00:00:00","AM2301":{"Temperature":22.1}}"#;
        assert_eq!(tpl.apply(payload).unwrap(), "22.1");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let tpl = ValueTemplate::parse("{{ value_json.TEMP }}");
        let err = tpl.apply(r#"{"HUM": 40}"#).unwrap_err();
        assert!(matches!(err, TemplateError::FieldNotFound { .. }));
    }

    #[test]
    fn test_non_json_payload_is_an_error() {
        let tpl = ValueTemplate::parse("{{ value_json.TEMP }}");
        let err = tpl.apply("not-json").unwrap_err();
        assert!(matches!(err, TemplateError::PayloadNotJson { .. }));
    }

    #[test]
    fn test_unsupported_expression_fails_per_message() {
        let tpl = ValueTemplate::parse("{{ value | float * 10 }}");
        assert!(matches!(tpl, ValueTemplate::Unsupported(_)));
        assert!(matches!(
            tpl.apply("1.0").unwrap_err(),
            TemplateError::Unsupported(_)
        ));
    }
}

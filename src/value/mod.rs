//! Typed values and payload codecs
//!
//! Pure, stateless mapping between raw transport payloads and a component's
//! typed domain value. Each channel owns exactly one codec; decode errors are
//! per-message and never affect other channels or later messages.

pub mod template;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use template::{TemplateError, ValueTemplate};

/// Typed runtime datum carried by a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// Binary state (switch, contact, motion)
    Bool(bool),
    /// Numeric measurement
    Number(f64),
    /// Free-form text
    Text(String),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Per-message decode/encode failure
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload matched neither the configured on nor off string
    #[error("payload '{payload}' matches neither on ('{on}') nor off ('{off}')")]
    UnexpectedPayload {
        payload: String,
        on: String,
        off: String,
    },

    /// payload_on and payload_off are configured identical; every decode is
    /// ambiguous
    #[error("ambiguous on/off vocabulary: both states map to '{0}'")]
    AmbiguousOnOff(String),

    /// Payload bytes were not valid UTF-8 where text was required
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// Extracted payload did not parse as a number
    #[error("'{0}' is not a valid number")]
    NotNumeric(String),

    /// Value template application failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Value type does not fit the codec (e.g. text into an on/off codec)
    #[error("cannot encode {value_type} value with {codec} codec")]
    EncodeMismatch {
        value_type: &'static str,
        codec: &'static str,
    },
}

/// Codec binding a channel to its payload vocabulary
///
/// `decode` maps raw transport bytes to a [`Value`]; `encode` maps a command
/// [`Value`] back to the bytes published on the command topic.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCodec {
    /// Binary on/off with configurable payload strings; comparison is
    /// byte-exact, anything else is a decode error (never coerced)
    OnOff { payload_on: String, payload_off: String },

    /// Numeric value, optionally extracted from the payload via template.
    /// With a scale the device payload covers `0..=scale` and decodes to a
    /// percentage; encode maps percentages back onto the device range.
    Number {
        template: Option<ValueTemplate>,
        unit: Option<String>,
        scale: Option<f64>,
    },

    /// Text value, optionally extracted via template
    Text { template: Option<ValueTemplate> },
}

impl ValueCodec {
    fn codec_name(&self) -> &'static str {
        match self {
            ValueCodec::OnOff { .. } => "on/off",
            ValueCodec::Number { .. } => "number",
            ValueCodec::Text { .. } => "text",
        }
    }

    /// Decode a raw payload into the codec's value domain
    pub fn decode(&self, raw: &[u8]) -> Result<Value, DecodeError> {
        match self {
            ValueCodec::OnOff {
                payload_on,
                payload_off,
            } => {
                if payload_on == payload_off {
                    return Err(DecodeError::AmbiguousOnOff(payload_on.clone()));
                }
                if raw == payload_on.as_bytes() {
                    Ok(Value::Bool(true))
                } else if raw == payload_off.as_bytes() {
                    Ok(Value::Bool(false))
                } else {
                    Err(DecodeError::UnexpectedPayload {
                        payload: String::from_utf8_lossy(raw).into_owned(),
                        on: payload_on.clone(),
                        off: payload_off.clone(),
                    })
                }
            }
            ValueCodec::Number {
                template, scale, ..
            } => {
                let text = Self::extract(raw, template)?;
                let trimmed = text.trim();
                let number = trimmed
                    .parse::<f64>()
                    .map_err(|_| DecodeError::NotNumeric(trimmed.to_string()))?;
                Ok(Value::Number(match scale {
                    Some(max) => number / max * 100.0,
                    None => number,
                }))
            }
            ValueCodec::Text { template } => Ok(Value::Text(Self::extract(raw, template)?)),
        }
    }

    /// Encode a value into the raw payload published on a command topic
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, DecodeError> {
        match (self, value) {
            (ValueCodec::OnOff { payload_on, .. }, Value::Bool(true)) => {
                Ok(payload_on.clone().into_bytes())
            }
            (ValueCodec::OnOff { payload_off, .. }, Value::Bool(false)) => {
                Ok(payload_off.clone().into_bytes())
            }
            (ValueCodec::Number { scale, .. }, Value::Number(n)) => {
                let raw = match scale {
                    Some(max) => (n / 100.0 * max).round(),
                    None => *n,
                };
                Ok(raw.to_string().into_bytes())
            }
            (ValueCodec::Text { .. }, Value::Text(s)) => Ok(s.clone().into_bytes()),
            (codec, value) => Err(DecodeError::EncodeMismatch {
                value_type: value.type_name(),
                codec: codec.codec_name(),
            }),
        }
    }

    fn extract(raw: &[u8], template: &Option<ValueTemplate>) -> Result<String, DecodeError> {
        let text = std::str::from_utf8(raw).map_err(|_| DecodeError::NotUtf8)?;
        match template {
            Some(tpl) => Ok(tpl.apply(text)?),
            None => Ok(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_off(on: &str, off: &str) -> ValueCodec {
        ValueCodec::OnOff {
            payload_on: on.to_string(),
            payload_off: off.to_string(),
        }
    }

    #[test]
    fn test_on_off_decode() {
        let codec = on_off("ON", "OFF");
        assert_eq!(codec.decode(b"ON").unwrap(), Value::Bool(true));
        assert_eq!(codec.decode(b"OFF").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_on_off_rejects_unknown_payload() {
        let codec = on_off("ON", "OFF");
        let err = codec.decode(b"MAYBE").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedPayload { .. }));
    }

    #[test]
    fn test_on_off_is_case_sensitive() {
        // Byte-exact match, never coerced
        let codec = on_off("ON", "OFF");
        assert!(codec.decode(b"on").is_err());
    }

    #[test]
    fn test_ambiguous_vocabulary_always_errors() {
        let codec = on_off("SAME", "SAME");
        assert!(matches!(
            codec.decode(b"SAME").unwrap_err(),
            DecodeError::AmbiguousOnOff(_)
        ));
        // Encode still has a defined answer
        assert_eq!(codec.encode(&Value::Bool(true)).unwrap(), b"SAME");
    }

    #[test]
    fn test_on_off_round_trip_with_custom_strings() {
        let codec = on_off("offen", "zu");
        for v in [Value::Bool(true), Value::Bool(false)] {
            let encoded = codec.encode(&v).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), v);
        }
    }

    #[test]
    fn test_number_decode() {
        let codec = ValueCodec::Number {
            template: None,
            unit: Some("°C".to_string()),
            scale: None,
        };
        assert_eq!(codec.decode(b"21.5").unwrap(), Value::Number(21.5));
        assert_eq!(codec.decode(b" 7 ").unwrap(), Value::Number(7.0));
        assert!(matches!(
            codec.decode(b"warm").unwrap_err(),
            DecodeError::NotNumeric(_)
        ));
    }

    #[test]
    fn test_number_with_template() {
        let codec = ValueCodec::Number {
            template: Some(ValueTemplate::parse("{{ value_json.TEMP }}")),
            unit: None,
            scale: None,
        };
        assert_eq!(
            codec.decode(br#"{"TEMP": 19.25}"#).unwrap(),
            Value::Number(19.25)
        );
        assert!(matches!(
            codec.decode(b"garbled").unwrap_err(),
            DecodeError::Template(_)
        ));
    }

    #[test]
    fn test_number_round_trip() {
        let codec = ValueCodec::Number {
            template: None,
            unit: None,
            scale: None,
        };
        let encoded = codec.encode(&Value::Number(42.5)).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), Value::Number(42.5));
    }

    #[test]
    fn test_scaled_number_maps_to_percent() {
        let codec = ValueCodec::Number {
            template: None,
            unit: None,
            scale: Some(255.0),
        };
        assert_eq!(codec.decode(b"255").unwrap(), Value::Number(100.0));
        assert_eq!(codec.decode(b"0").unwrap(), Value::Number(0.0));
        assert_eq!(codec.decode(b"51").unwrap(), Value::Number(20.0));
        // Encode maps percent back onto the device range, rounded
        assert_eq!(codec.encode(&Value::Number(100.0)).unwrap(), b"255");
        assert_eq!(codec.encode(&Value::Number(0.0)).unwrap(), b"0");
        assert_eq!(codec.encode(&Value::Number(50.0)).unwrap(), b"128");
    }

    #[test]
    fn test_text_decode_rejects_invalid_utf8() {
        let codec = ValueCodec::Text { template: None };
        assert_eq!(
            codec.decode(b"hello").unwrap(),
            Value::Text("hello".to_string())
        );
        assert!(matches!(
            codec.decode(&[0xff, 0xfe]).unwrap_err(),
            DecodeError::NotUtf8
        ));
    }

    #[test]
    fn test_encode_type_mismatch() {
        let codec = on_off("ON", "OFF");
        assert!(matches!(
            codec.encode(&Value::Text("ON".to_string())).unwrap_err(),
            DecodeError::EncodeMismatch { .. }
        ));
    }
}

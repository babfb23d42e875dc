//! Built-in component type descriptors
//!
//! One descriptor per supported discovery type tag. Default values mirror the
//! Home Assistant MQTT discovery convention exactly; they are produced by
//! third-party devices and are part of the external contract.

use serde_json::{json, Map, Value as JsonValue};

use crate::component::factory::ComponentConfig;
use crate::component::registry::{ChannelSpec, ComponentDescriptor, ConstraintPredicate};
use crate::value::{ValueCodec, ValueTemplate};

/// All built-in descriptors
pub fn builtin() -> Vec<ComponentDescriptor> {
    vec![binary_sensor(), sensor(), switch(), light()]
}

fn as_map(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => unreachable!("descriptor defaults are object literals"),
    }
}

/// Fields shared by every component type, with convention defaults
fn common_defaults() -> Map<String, JsonValue> {
    as_map(json!({
        "icon": "",
        "qos": 1,
        "retain": true,
        "value_template": null,
        "unique_id": null,
        "unit_of_measurement": "",
        "device_class": null,
        "force_update": false,
        "expire_after": 0,
        "state_topic": "",
        "command_topic": "",
        "payload_on": "ON",
        "payload_off": "OFF",
        "availability_topic": null,
        "payload_available": "online",
        "payload_not_available": "offline",
        "brightness_state_topic": "",
        "brightness_command_topic": "",
        "brightness_value_template": null,
        "brightness_scale": 255,
    }))
}

fn defaults_with_name(name: &str) -> Map<String, JsonValue> {
    let mut defaults = common_defaults();
    defaults.insert("name".to_string(), json!(name));
    defaults
}

fn none_if_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parsed_template(expr: Option<&str>) -> Option<ValueTemplate> {
    expr.map(ValueTemplate::parse)
}

/// Sensor-class components do not support forced updates; the convention
/// reserves `force_update` for state-bearing entities that re-announce
/// unchanged values.
const FORCE_UPDATE_UNSUPPORTED: ConstraintPredicate = ConstraintPredicate {
    name: "force_update_unsupported",
    check: |config| !config.force_update,
};

/// A switch with neither topic can neither report nor accept anything.
const STATE_OR_COMMAND_TOPIC_REQUIRED: ConstraintPredicate = ConstraintPredicate {
    name: "state_or_command_topic_required",
    check: |config| !config.state_topic.is_empty() || !config.command_topic.is_empty(),
};

/// A zero scale would make every brightness payload divide by zero.
const BRIGHTNESS_SCALE_POSITIVE: ConstraintPredicate = ConstraintPredicate {
    name: "brightness_scale_positive",
    check: |config| config.brightness_scale > 0,
};

pub fn binary_sensor() -> ComponentDescriptor {
    ComponentDescriptor {
        type_tag: "binary_sensor",
        defaults: || defaults_with_name("MQTT Sensor"),
        required: &["state_topic"],
        constraints: &[FORCE_UPDATE_UNSUPPORTED],
        channels: |config| {
            vec![ChannelSpec {
                role: "sensor",
                label: config.name.clone(),
                unit: none_if_empty(&config.unit_of_measurement),
                state_topic: none_if_empty(&config.state_topic),
                command_topic: None,
                codec: ValueCodec::OnOff {
                    payload_on: config.payload_on.clone(),
                    payload_off: config.payload_off.clone(),
                },
            }]
        },
    }
}

pub fn sensor() -> ComponentDescriptor {
    ComponentDescriptor {
        type_tag: "sensor",
        defaults: || defaults_with_name("MQTT Sensor"),
        required: &["state_topic"],
        constraints: &[FORCE_UPDATE_UNSUPPORTED],
        channels: |config| {
            vec![ChannelSpec {
                role: "sensor",
                label: config.name.clone(),
                unit: none_if_empty(&config.unit_of_measurement),
                state_topic: none_if_empty(&config.state_topic),
                command_topic: None,
                codec: ValueCodec::Number {
                    template: parsed_template(config.value_template.as_deref()),
                    unit: none_if_empty(&config.unit_of_measurement),
                    scale: None,
                },
            }]
        },
    }
}

pub fn switch() -> ComponentDescriptor {
    ComponentDescriptor {
        type_tag: "switch",
        defaults: || defaults_with_name("MQTT Switch"),
        required: &[],
        constraints: &[STATE_OR_COMMAND_TOPIC_REQUIRED],
        channels: |config| {
            vec![ChannelSpec {
                role: "switch",
                label: config.name.clone(),
                unit: None,
                state_topic: none_if_empty(&config.state_topic),
                command_topic: none_if_empty(&config.command_topic),
                codec: ValueCodec::OnOff {
                    payload_on: config.payload_on.clone(),
                    payload_off: config.payload_off.clone(),
                },
            }]
        },
    }
}

/// Light derives up to two channels: the on/off switch channel and, when
/// brightness topics are configured, a separate numeric brightness channel.
pub fn light() -> ComponentDescriptor {
    ComponentDescriptor {
        type_tag: "light",
        defaults: || defaults_with_name("MQTT Light"),
        required: &["command_topic"],
        constraints: &[FORCE_UPDATE_UNSUPPORTED, BRIGHTNESS_SCALE_POSITIVE],
        channels: |config| {
            let mut channels = vec![ChannelSpec {
                role: "light",
                label: config.name.clone(),
                unit: None,
                state_topic: none_if_empty(&config.state_topic),
                command_topic: none_if_empty(&config.command_topic),
                codec: ValueCodec::OnOff {
                    payload_on: config.payload_on.clone(),
                    payload_off: config.payload_off.clone(),
                },
            }];
            if !config.brightness_state_topic.is_empty()
                || !config.brightness_command_topic.is_empty()
            {
                channels.push(ChannelSpec {
                    role: "brightness",
                    label: format!("{} Brightness", config.name),
                    unit: None,
                    state_topic: none_if_empty(&config.brightness_state_topic),
                    command_topic: none_if_empty(&config.brightness_command_topic),
                    // Brightness has its own template; the component-level
                    // value_template applies to the state topic only.
                    codec: ValueCodec::Number {
                        template: parsed_template(config.brightness_value_template.as_deref()),
                        unit: None,
                        scale: Some(f64::from(config.brightness_scale)),
                    },
                });
            }
            channels
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_defaults_match_the_convention() {
        let defaults = common_defaults();
        assert_eq!(defaults["qos"], json!(1));
        assert_eq!(defaults["retain"], json!(true));
        assert_eq!(defaults["payload_on"], json!("ON"));
        assert_eq!(defaults["payload_off"], json!("OFF"));
        assert_eq!(defaults["payload_available"], json!("online"));
        assert_eq!(defaults["payload_not_available"], json!("offline"));
        assert_eq!(defaults["force_update"], json!(false));
        assert_eq!(defaults["expire_after"], json!(0));
    }

    #[test]
    fn test_per_type_display_names() {
        assert_eq!((binary_sensor().defaults)()["name"], json!("MQTT Sensor"));
        assert_eq!((switch().defaults)()["name"], json!("MQTT Switch"));
        assert_eq!((light().defaults)()["name"], json!("MQTT Light"));
    }
}

//! Component factory and configuration validator
//!
//! Turns a type tag plus raw discovery JSON into a fully assembled
//! [`Component`], or a structured error. Construction is all-or-nothing: no
//! channels exist and no subscriptions are made until every validation step
//! has passed. Subscribing is the dispatcher's job.
//!
//! The merge-with-defaults step is explicit rather than hidden in serde
//! defaulting: silent defaults are a correctness-relevant part of the wire
//! contract and need to be visible and testable.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::channel::{ChannelId, ComponentChannel};
use crate::component::registry::{ComponentDescriptor, ComponentRegistry};
use crate::component::{Availability, Component, ComponentIdentity};
use crate::error::{BridgeError, Result};

/// Typed, defaulted configuration shared by all built-in component types
///
/// Field names match the discovery convention exactly; they are produced by
/// third-party devices. Deserialized from the merged (defaults + raw) JSON,
/// never straight from the raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    pub icon: String,
    pub qos: u8,
    pub retain: bool,
    pub value_template: Option<String>,
    pub unique_id: Option<String>,
    pub unit_of_measurement: String,
    pub device_class: Option<String>,
    pub force_update: bool,
    pub expire_after: u64,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_on: String,
    pub payload_off: String,
    pub availability_topic: Option<String>,
    pub payload_available: String,
    pub payload_not_available: String,
    pub brightness_state_topic: String,
    pub brightness_command_topic: String,
    pub brightness_value_template: Option<String>,
    pub brightness_scale: u32,
    /// Convention fields this bridge does not interpret; kept so nothing is
    /// silently lost
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Merge raw discovery fields over descriptor defaults, field by field.
/// Unspecified fields keep their documented default; raw always wins.
fn merge_with_defaults(
    mut defaults: Map<String, JsonValue>,
    raw: &Map<String, JsonValue>,
) -> Map<String, JsonValue> {
    for (key, value) in raw {
        defaults.insert(key.clone(), value.clone());
    }
    defaults
}

fn check_required(
    descriptor: &ComponentDescriptor,
    raw: &Map<String, JsonValue>,
) -> Result<()> {
    for field in descriptor.required {
        match raw.get(*field) {
            Some(value) if !value.is_null() => {}
            _ => return Err(BridgeError::missing_field(descriptor.type_tag, *field)),
        }
    }
    Ok(())
}

/// Build a validated component from a raw discovery payload.
///
/// Steps, in order: resolve the descriptor, check required fields against the
/// raw payload, merge over defaults, run the descriptor's constraint
/// predicates (first violation wins), derive channels, assemble. Any failure
/// aborts this one component only.
pub fn build_component(
    registry: &ComponentRegistry,
    type_tag: &str,
    raw: &JsonValue,
    identity: ComponentIdentity,
) -> Result<Component> {
    let descriptor = registry.resolve(type_tag)?;

    let raw_obj = raw.as_object().ok_or_else(|| {
        BridgeError::Generic(anyhow::anyhow!(
            "discovery payload for {identity} is not a JSON object"
        ))
    })?;

    check_required(descriptor, raw_obj)?;

    let merged = merge_with_defaults((descriptor.defaults)(), raw_obj);
    let config: ComponentConfig = serde_json::from_value(JsonValue::Object(merged))?;

    if config.qos > 2 {
        return Err(BridgeError::unsupported_configuration(
            descriptor.type_tag,
            "qos_out_of_range",
        ));
    }

    for predicate in descriptor.constraints {
        if !(predicate.check)(&config) {
            return Err(BridgeError::unsupported_configuration(
                descriptor.type_tag,
                predicate.name,
            ));
        }
    }

    let specs = (descriptor.channels)(&config);
    let mut roles: Vec<_> = specs.iter().map(|s| s.role).collect();
    roles.sort_unstable();
    if roles.windows(2).any(|w| w[0] == w[1]) {
        return Err(BridgeError::unsupported_configuration(
            descriptor.type_tag,
            "duplicate_channel_role",
        ));
    }

    let alive = Arc::new(AtomicBool::new(true));
    let channels = specs
        .into_iter()
        .map(|spec| {
            Arc::new(ComponentChannel::new(
                ChannelId::new(identity.clone(), spec.role),
                spec.label,
                spec.unit,
                spec.state_topic,
                spec.command_topic,
                spec.codec,
                config.qos,
                config.retain,
                config.force_update,
                alive.clone(),
            ))
        })
        .collect();

    let availability = config
        .availability_topic
        .as_deref()
        .filter(|topic| !topic.is_empty())
        .map(|topic| {
            Availability::new(
                topic,
                config.payload_available.clone(),
                config.payload_not_available.clone(),
            )
        });

    let unique_id = config
        .unique_id
        .clone()
        .unwrap_or_else(|| auto_unique_id(&identity));

    Ok(Component::new(
        identity,
        descriptor.type_tag.to_string(),
        config.name.clone(),
        Some(unique_id),
        channels,
        availability,
        alive,
    ))
}

/// Stable fallback id for payloads without a `unique_id`
fn auto_unique_id(identity: &ComponentIdentity) -> String {
    format!(
        "{}_{}_{}",
        identity.thing_id,
        identity.ha_id.component,
        identity.ha_id.object_path()
    )
    .replace(['/', '-'], "_")
}

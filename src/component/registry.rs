//! Component descriptor registry
//!
//! Maps a discovery type tag (e.g. "binary_sensor") to the schema that
//! governs it: documented defaults, required fields, per-type constraint
//! predicates and the channel derivation rule. The factory and dispatcher
//! contain no type-specific branching; new component types are added by
//! registering a descriptor here.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use crate::component::descriptors;
use crate::component::factory::ComponentConfig;
use crate::error::{BridgeError, Result};
use crate::value::ValueCodec;

/// Blueprint for one channel a component type derives from its config
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    /// Role unique within the component, e.g. "sensor" or "brightness"
    pub role: &'static str,
    pub label: String,
    pub unit: Option<String>,
    pub state_topic: Option<String>,
    pub command_topic: Option<String>,
    pub codec: ValueCodec,
}

/// A named construction-time rule a configuration must satisfy
///
/// `check` returns true when the configuration is acceptable. The forbidden
/// combination table is data supplied per descriptor, never hard-coded in
/// the factory.
pub struct ConstraintPredicate {
    pub name: &'static str,
    pub check: fn(&ComponentConfig) -> bool,
}

/// Schema and construction rule for one component type
pub struct ComponentDescriptor {
    /// Discovery convention type tag
    pub type_tag: &'static str,
    /// Documented default field values; field names and defaults are part of
    /// the external discovery contract
    pub defaults: fn() -> Map<String, JsonValue>,
    /// Fields that must be present in the raw discovery payload
    pub required: &'static [&'static str],
    /// Per-type forbidden-combination predicates, checked in order
    pub constraints: &'static [ConstraintPredicate],
    /// Derives the channel set from the merged, validated configuration
    pub channels: fn(&ComponentConfig) -> Vec<ChannelSpec>,
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_tag", &self.type_tag)
            .field("required", &self.required)
            .field(
                "constraints",
                &self.constraints.iter().map(|c| c.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Registry of known component types
pub struct ComponentRegistry {
    descriptors: HashMap<&'static str, ComponentDescriptor>,
}

impl ComponentRegistry {
    /// Empty registry, for hosts that want full control over supported types
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in component types
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors::builtin() {
            registry.register(descriptor);
        }
        registry
    }

    /// Register (or replace) a descriptor
    pub fn register(&mut self, descriptor: ComponentDescriptor) {
        self.descriptors.insert(descriptor.type_tag, descriptor);
    }

    /// Resolve a type tag to its descriptor
    pub fn resolve(&self, type_tag: &str) -> Result<&ComponentDescriptor> {
        self.descriptors
            .get(type_tag)
            .ok_or_else(|| BridgeError::unknown_component(type_tag))
    }

    pub fn is_supported(&self, type_tag: &str) -> bool {
        self.descriptors.contains_key(type_tag)
    }

    /// All registered type tags, sorted for stable output
    pub fn type_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.descriptors.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

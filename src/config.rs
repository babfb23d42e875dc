//! Bridge configuration

use serde::{Deserialize, Serialize};

/// Configuration for the discovery bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Discovery topic prefix (default: "homeassistant")
    pub discovery_prefix: String,

    /// Host thing id discovered components are attached to
    pub thing_id: String,

    /// Component type tags to process (empty = all registered types)
    pub components: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            discovery_prefix: "homeassistant".to_string(),
            thing_id: "mqtt-bridge".to_string(),
            components: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Create config from `HASS_BRIDGE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(prefix) = std::env::var("HASS_BRIDGE_DISCOVERY_PREFIX") {
            if !prefix.is_empty() {
                config.discovery_prefix = prefix;
            }
        }

        if let Ok(thing_id) = std::env::var("HASS_BRIDGE_THING_ID") {
            if !thing_id.is_empty() {
                config.thing_id = thing_id;
            }
        }

        if let Ok(components) = std::env::var("HASS_BRIDGE_COMPONENTS") {
            config.components = components
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }

        config
    }

    /// Wildcard subscriptions covering both discovery topic layouts
    /// (`prefix/component/object/config` and
    /// `prefix/component/node/object/config`)
    pub fn discovery_subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}/+/+/config", self.discovery_prefix),
            format!("{}/+/+/+/config", self.discovery_prefix),
        ]
    }

    /// Whether a component type passes the allow-list
    pub fn should_process_component(&self, component: &str) -> bool {
        self.components.is_empty() || self.components.iter().any(|c| c == component)
    }
}

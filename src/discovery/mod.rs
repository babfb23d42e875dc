//! Discovery message handling
//!
//! Topic classification plus the dispatcher that drives the per-identity
//! Unknown → Active → Removed lifecycle.

pub mod dispatcher;

pub use dispatcher::DiscoveryDispatcher;

use crate::component::HaId;
use crate::error::{BridgeError, Result};

/// A parsed discovery topic
///
/// The convention publishes component configuration to
/// `<prefix>/<component>/<object_id>/config` or, with a node grouping,
/// `<prefix>/<component>/<node_id>/<object_id>/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTopic {
    pub ha_id: HaId,
}

impl DiscoveryTopic {
    /// Parse and validate a discovery topic against the configured prefix
    pub fn parse(prefix: &str, topic: &str) -> Result<Self> {
        let parts: Vec<&str> = topic.split('/').collect();

        let valid = matches!(parts.len(), 4 | 5)
            && parts[0] == prefix
            && parts[parts.len() - 1] == "config"
            && parts.iter().all(|segment| !segment.is_empty());
        if !valid {
            return Err(BridgeError::invalid_topic(topic));
        }

        let ha_id = match parts.len() {
            4 => HaId::new(parts[1], None, parts[2]),
            5 => HaId::new(parts[1], Some(parts[2].to_string()), parts[3]),
            _ => unreachable!(),
        };

        Ok(Self { ha_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_segment_topic() {
        let topic = DiscoveryTopic::parse("homeassistant", "homeassistant/switch/lamp/config")
            .unwrap();
        assert_eq!(topic.ha_id, HaId::new("switch", None, "lamp"));
    }

    #[test]
    fn test_parse_five_segment_topic() {
        let topic = DiscoveryTopic::parse(
            "homeassistant",
            "homeassistant/sensor/garden/soil/config",
        )
        .unwrap();
        assert_eq!(
            topic.ha_id,
            HaId::new("sensor", Some("garden".to_string()), "soil")
        );
    }

    #[test]
    fn test_rejects_foreign_and_malformed_topics() {
        for topic in [
            "homeassistant/switch/lamp/state",
            "other/switch/lamp/config",
            "homeassistant/config",
            "homeassistant/switch//config",
            "homeassistant/switch/a/b/c/config",
            "tele/sensor/SENSOR",
        ] {
            assert!(
                DiscoveryTopic::parse("homeassistant", topic).is_err(),
                "should reject: {topic}"
            );
        }
    }

    #[test]
    fn test_custom_prefix() {
        assert!(DiscoveryTopic::parse("ha", "ha/light/hall/config").is_ok());
        assert!(DiscoveryTopic::parse("ha", "homeassistant/light/hall/config").is_err());
    }
}

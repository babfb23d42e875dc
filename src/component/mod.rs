//! Discovered components and their identity
//!
//! A component is one logical device sub-entity (binary sensor, switch, ...)
//! assembled from a discovery payload: identity, display name, an ordered set
//! of channels and an optional availability record. Components exclusively
//! own their channels; the dispatcher and host hold non-owning references
//! keyed by identity.

pub mod descriptors;
pub mod factory;
pub mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::ComponentChannel;

pub use factory::{build_component, ComponentConfig};
pub use registry::{ChannelSpec, ComponentDescriptor, ComponentRegistry, ConstraintPredicate};

/// Identity of a component within the discovery convention
///
/// Derived from the discovery topic
/// `<prefix>/<component>/[<node_id>/]<object_id>/config`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HaId {
    /// Component type tag, e.g. "binary_sensor"
    pub component: String,
    /// Optional node grouping segment (five-segment topics)
    pub node_id: Option<String>,
    /// Object id unique within the component type
    pub object_id: String,
}

impl HaId {
    pub fn new(
        component: impl Into<String>,
        node_id: Option<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            node_id,
            object_id: object_id.into(),
        }
    }

    /// Canonical object path: `node_id/object_id` or just `object_id`
    pub fn object_path(&self) -> String {
        match &self.node_id {
            Some(node) => format!("{}/{}", node, self.object_id),
            None => self.object_id.clone(),
        }
    }
}

impl std::fmt::Display for HaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.component, self.object_path())
    }
}

/// Key a component is registered under, host thing plus discovery identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIdentity {
    /// Host thing the component belongs to
    pub thing_id: String,
    /// Discovery-side identity
    pub ha_id: HaId,
}

impl ComponentIdentity {
    pub fn new(thing_id: impl Into<String>, ha_id: HaId) -> Self {
        Self {
            thing_id: thing_id.into(),
            ha_id,
        }
    }
}

impl std::fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.thing_id, self.ha_id)
    }
}

/// Shared availability record for a component
///
/// Tracks reachability from a dedicated topic, independent of individual
/// channel values.
#[derive(Debug)]
pub struct Availability {
    topic: String,
    payload_available: String,
    payload_not_available: String,
    online: AtomicBool,
}

impl Availability {
    pub fn new(
        topic: impl Into<String>,
        payload_available: impl Into<String>,
        payload_not_available: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload_available: payload_available.into(),
            payload_not_available: payload_not_available.into(),
            // Assume reachable until the availability topic says otherwise
            online: AtomicBool::new(true),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Byte-exact match against the configured payload pair. Returns the new
    /// reachability on a match, `None` for unrecognized payloads (the caller
    /// logs and ignores those).
    pub fn handle_message(&self, payload: &[u8]) -> Option<bool> {
        if payload == self.payload_available.as_bytes() {
            self.online.store(true, Ordering::SeqCst);
            Some(true)
        } else if payload == self.payload_not_available.as_bytes() {
            self.online.store(false, Ordering::SeqCst);
            Some(false)
        } else {
            None
        }
    }
}

/// The assembled entity exposed uniformly regardless of concrete type
#[derive(Debug)]
pub struct Component {
    identity: ComponentIdentity,
    type_tag: String,
    name: String,
    unique_id: Option<String>,
    channels: Vec<Arc<ComponentChannel>>,
    availability: Option<Availability>,
    alive: Arc<AtomicBool>,
}

impl Component {
    pub(crate) fn new(
        identity: ComponentIdentity,
        type_tag: String,
        name: String,
        unique_id: Option<String>,
        channels: Vec<Arc<ComponentChannel>>,
        availability: Option<Availability>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            identity,
            type_tag,
            name,
            unique_id,
            channels,
            availability,
            alive,
        }
    }

    pub fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Display name from the discovery config
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    /// Channels in declaration order; roles are unique within a component
    pub fn channels(&self) -> &[Arc<ComponentChannel>] {
        &self.channels
    }

    pub fn channel(&self, role: &str) -> Option<&Arc<ComponentChannel>> {
        self.channels.iter().find(|c| c.role() == role)
    }

    pub fn availability(&self) -> Option<&Availability> {
        self.availability.as_ref()
    }

    /// Reachability; components without an availability topic count as online
    pub fn is_online(&self) -> bool {
        self.availability.as_ref().map_or(true, |a| a.is_online())
    }

    /// Every topic the dispatcher must subscribe for this component: channel
    /// state topics plus the availability topic, if configured
    pub fn subscription_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .channels
            .iter()
            .filter_map(|c| c.state_topic().map(str::to_string))
            .collect();
        if let Some(availability) = &self.availability {
            topics.push(availability.topic().to_string());
        }
        topics
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the component torn down. Channel message handling checks this
    /// flag before mutating state, so in-flight messages already handed to
    /// the dispatcher stop producing listener invocations immediately.
    pub fn tear_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

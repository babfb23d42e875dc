//! Typed, topic-bound channels
//!
//! A channel is one named endpoint of a component: bound to a state topic
//! (subscribe), optionally a command topic (publish), holding the last known
//! decoded value and notifying a listener when it changes. Channels are
//! created by the component factory and die with their component.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::component::ComponentIdentity;
use crate::error::{BridgeError, Result};
use crate::transport::{ChannelUpdateListener, MessageTransport};
use crate::value::{Value, ValueCodec};

/// Channel identity: owning component plus role (e.g. "sensor")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub component: ComponentIdentity,
    pub role: String,
}

impl ChannelId {
    pub fn new(component: ComponentIdentity, role: impl Into<String>) -> Self {
        Self {
            component,
            role: role.into(),
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.component, self.role)
    }
}

/// Last-known decoded value, last-write-wins
#[derive(Debug, Clone, Default)]
struct ChannelState {
    value: Option<Value>,
    last_updated: Option<DateTime<Utc>>,
}

/// A named, typed endpoint of a component
#[derive(Debug)]
pub struct ComponentChannel {
    id: ChannelId,
    label: String,
    unit: Option<String>,
    state_topic: Option<String>,
    command_topic: Option<String>,
    codec: ValueCodec,
    qos: u8,
    retain: bool,
    force_update: bool,
    /// Shared with the owning component; cleared on tear-down
    alive: Arc<AtomicBool>,
    state: Mutex<ChannelState>,
}

impl ComponentChannel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ChannelId,
        label: String,
        unit: Option<String>,
        state_topic: Option<String>,
        command_topic: Option<String>,
        codec: ValueCodec,
        qos: u8,
        retain: bool,
        force_update: bool,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            label,
            unit,
            state_topic,
            command_topic,
            codec,
            qos,
            retain,
            force_update,
            alive,
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.id.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn state_topic(&self) -> Option<&str> {
        self.state_topic.as_deref()
    }

    pub fn command_topic(&self) -> Option<&str> {
        self.command_topic.as_deref()
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Whether the channel accepts commands
    pub fn is_writable(&self) -> bool {
        self.command_topic.is_some()
    }

    /// Last known decoded value, if any message arrived yet
    pub fn current_value(&self) -> Option<Value> {
        self.state.lock().expect("channel state lock").value.clone()
    }

    /// When the value last changed
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.lock().expect("channel state lock").last_updated
    }

    /// Process a state-topic payload.
    ///
    /// Decodes via the channel codec and compares against the current value:
    /// unchanged values are absorbed (unless `force_update` is configured),
    /// changed values are stored and pushed to the listener synchronously.
    /// Returns the newly applied value, `Ok(None)` when the message was
    /// absorbed, or the decode error; on error the current value is kept.
    pub fn handle_state_message(
        &self,
        payload: &[u8],
        listener: &dyn ChannelUpdateListener,
    ) -> Result<Option<Value>> {
        // Torn-down components must not produce further updates, even for
        // messages already in flight when the removal arrived.
        if !self.alive.load(Ordering::SeqCst) {
            trace!(channel = %self.id, "dropping message for torn-down channel");
            return Ok(None);
        }

        let decoded = self.codec.decode(payload)?;

        {
            let mut state = self.state.lock().expect("channel state lock");
            if !self.force_update && state.value.as_ref() == Some(&decoded) {
                return Ok(None);
            }
            state.value = Some(decoded.clone());
            state.last_updated = Some(Utc::now());
        }

        // Listener hands off to the host asynchronously; this call must stay
        // non-blocking.
        listener.channel_value_changed(&self.id, &decoded);
        Ok(Some(decoded))
    }

    /// Encode a command value and request a publish on the command topic.
    ///
    /// Channels without a command topic reject commands; the capability is
    /// simply absent.
    pub async fn send_command<T: MessageTransport + ?Sized>(
        &self,
        value: &Value,
        transport: &T,
    ) -> Result<()> {
        let topic = self
            .command_topic
            .as_deref()
            .ok_or_else(|| BridgeError::CommandNotSupported {
                channel: self.id.to_string(),
            })?;

        let payload = self.codec.encode(value)?;
        transport
            .publish(topic, &payload, self.qos, self.retain)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::HaId;

    struct CountingListener {
        updates: Mutex<Vec<(ChannelId, Value)>>,
    }

    impl CountingListener {
        fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
            }
        }

        fn updates(&self) -> Vec<(ChannelId, Value)> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl ChannelUpdateListener for CountingListener {
        fn channel_value_changed(&self, channel: &ChannelId, value: &Value) {
            self.updates
                .lock()
                .unwrap()
                .push((channel.clone(), value.clone()));
        }
    }

    fn test_channel(force_update: bool) -> ComponentChannel {
        let identity = ComponentIdentity::new(
            "thing-1",
            HaId::new("binary_sensor", None, "door"),
        );
        ComponentChannel::new(
            ChannelId::new(identity, "sensor"),
            "Door".to_string(),
            None,
            Some("home/door".to_string()),
            None,
            ValueCodec::OnOff {
                payload_on: "ON".to_string(),
                payload_off: "OFF".to_string(),
            },
            1,
            true,
            force_update,
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn test_update_on_change_only() {
        let channel = test_channel(false);
        let listener = CountingListener::new();

        assert_eq!(
            channel.handle_state_message(b"ON", &listener).unwrap(),
            Some(Value::Bool(true))
        );
        // Identical payload is absorbed
        assert_eq!(channel.handle_state_message(b"ON", &listener).unwrap(), None);
        assert_eq!(
            channel.handle_state_message(b"OFF", &listener).unwrap(),
            Some(Value::Bool(false))
        );
        assert_eq!(listener.updates().len(), 2);
    }

    #[test]
    fn test_force_update_notifies_on_every_message() {
        let channel = test_channel(true);
        let listener = CountingListener::new();

        channel.handle_state_message(b"ON", &listener).unwrap();
        channel.handle_state_message(b"ON", &listener).unwrap();
        assert_eq!(listener.updates().len(), 2);
    }

    #[test]
    fn test_decode_error_keeps_current_value() {
        let channel = test_channel(false);
        let listener = CountingListener::new();

        channel.handle_state_message(b"ON", &listener).unwrap();
        let err = channel.handle_state_message(b"MAYBE", &listener).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
        assert_eq!(channel.current_value(), Some(Value::Bool(true)));
        assert_eq!(listener.updates().len(), 1);
    }

    #[test]
    fn test_torn_down_channel_drops_messages() {
        let identity = ComponentIdentity::new("thing-1", HaId::new("switch", None, "lamp"));
        let alive = Arc::new(AtomicBool::new(true));
        let channel = ComponentChannel::new(
            ChannelId::new(identity, "switch"),
            "Lamp".to_string(),
            None,
            Some("stat/lamp/POWER".to_string()),
            Some("cmnd/lamp/POWER".to_string()),
            ValueCodec::OnOff {
                payload_on: "ON".to_string(),
                payload_off: "OFF".to_string(),
            },
            1,
            false,
            false,
            alive.clone(),
        );
        let listener = CountingListener::new();

        channel.handle_state_message(b"ON", &listener).unwrap();
        alive.store(false, Ordering::SeqCst);
        assert_eq!(channel.handle_state_message(b"OFF", &listener).unwrap(), None);
        assert_eq!(listener.updates().len(), 1);
        // Value is frozen at tear-down
        assert_eq!(channel.current_value(), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_command_without_command_topic_is_rejected() {
        use crate::mock::RecordingTransport;

        let channel = test_channel(false);
        let transport = RecordingTransport::new();
        let err = channel
            .send_command(&Value::Bool(true), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::CommandNotSupported { .. }));
        assert!(transport.published().is_empty());
    }
}

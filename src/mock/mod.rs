//! Mock implementations for testing
//!
//! In-memory transport, host registry and listener that record every call so
//! tests can assert on subscription, registration and notification order.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::channel::ChannelId;
use crate::component::{Component, ComponentIdentity};
use crate::error::{BridgeError, Result};
use crate::transport::{ChannelUpdateListener, HostRegistry, MessageTransport};
use crate::value::Value;

/// A single publish request captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

/// Mock transport recording subscribe/unsubscribe/publish calls
#[derive(Default)]
pub struct RecordingTransport {
    subscriptions: Mutex<Vec<String>>,
    unsubscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<PublishedMessage>>,
    fail_subscribe: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent subscribe calls fail with a transport error
    pub fn fail_subscriptions(&self, fail: bool) {
        *self.fail_subscribe.lock().unwrap() = fail;
    }

    /// Topics subscribed so far, in call order
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Topics unsubscribed so far, in call order
    pub fn unsubscriptions(&self) -> Vec<String> {
        self.unsubscriptions.lock().unwrap().clone()
    }

    /// All captured publish requests
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Currently active subscriptions (subscribed minus unsubscribed)
    pub fn active_subscriptions(&self) -> Vec<String> {
        let subscribed = self.subscriptions.lock().unwrap();
        let unsubscribed = self.unsubscriptions.lock().unwrap();
        subscribed
            .iter()
            .filter(|topic| {
                let subs = subscribed.iter().filter(|t| t == topic).count();
                let unsubs = unsubscribed.iter().filter(|t| t == topic).count();
                subs > unsubs
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn subscribe(&self, topic: &str) -> Result<()> {
        if *self.fail_subscribe.lock().unwrap() {
            return Err(BridgeError::transport(format!(
                "subscribe to '{topic}' refused by mock"
            )));
        }
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.unsubscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()> {
        self.published.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }
}

/// Registration event captured by [`RecordingRegistry`]
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Registered {
        identity: ComponentIdentity,
        name: String,
        channel_roles: Vec<String>,
    },
    Withdrawn(ComponentIdentity),
}

/// Mock host registry recording register/withdraw calls
#[derive(Default)]
pub struct RecordingRegistry {
    events: Mutex<Vec<RegistryEvent>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Identities currently registered (registered minus withdrawn)
    pub fn registered(&self) -> Vec<ComponentIdentity> {
        let mut active = Vec::new();
        for event in self.events.lock().unwrap().iter() {
            match event {
                RegistryEvent::Registered { identity, .. } => {
                    if !active.contains(identity) {
                        active.push(identity.clone());
                    }
                }
                RegistryEvent::Withdrawn(identity) => active.retain(|i| i != identity),
            }
        }
        active
    }
}

#[async_trait]
impl HostRegistry for RecordingRegistry {
    async fn register_component(&self, component: &Component) -> Result<()> {
        self.events.lock().unwrap().push(RegistryEvent::Registered {
            identity: component.identity().clone(),
            name: component.name().to_string(),
            channel_roles: component
                .channels()
                .iter()
                .map(|c| c.role().to_string())
                .collect(),
        });
        Ok(())
    }

    async fn withdraw_component(&self, identity: &ComponentIdentity) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RegistryEvent::Withdrawn(identity.clone()));
        Ok(())
    }
}

/// Mock listener recording channel value changes
#[derive(Default)]
pub struct RecordingListener {
    updates: Mutex<Vec<(ChannelId, Value)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(ChannelId, Value)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ChannelUpdateListener for RecordingListener {
    fn channel_value_changed(&self, channel: &ChannelId, value: &Value) {
        self.updates
            .lock()
            .unwrap()
            .push((channel.clone(), value.clone()));
    }
}

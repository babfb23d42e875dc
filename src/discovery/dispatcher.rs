//! Discovery dispatcher
//!
//! Consumes discovery topic arrivals, delegates construction to the factory
//! and keeps the per-identity component lifecycle consistent:
//!
//! - Unknown → non-empty payload → Active (channels subscribed, component
//!   registered with the host) or rejected (error surfaced, identity stays
//!   Unknown)
//! - Active → empty payload → Removed (unsubscribed, withdrawn), collapsing
//!   straight back to Unknown
//! - Active → new payload → atomic replacement; the old component is torn
//!   down only after the new one is fully constructed, and a failed build
//!   leaves the old one untouched
//!
//! Message handling is serialized per identity and parallel across
//! identities. No failure is fatal; the dispatcher never halts.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::channel::ComponentChannel;
use crate::component::{build_component, Component, ComponentIdentity, ComponentRegistry};
use crate::config::BridgeConfig;
use crate::discovery::DiscoveryTopic;
use crate::error::{BridgeError, Result};
use crate::transport::{ChannelUpdateListener, HostRegistry, MessageTransport};
use crate::value::Value;

/// Where a runtime state message is routed
#[derive(Clone)]
enum RouteTarget {
    Channel(Arc<ComponentChannel>),
    Availability(Arc<Component>),
}

/// Per-identity lifecycle slot; the mutex around it is the per-identity
/// critical section covering state transition plus channel mutation
#[derive(Default)]
struct ComponentSlot {
    component: Option<Arc<Component>>,
    /// Raw config payload the component was built from, for idempotent
    /// redelivery of the same retained message
    config_payload: Vec<u8>,
}

/// Translates discovery arrivals into live components and routes runtime
/// state messages into their channels
pub struct DiscoveryDispatcher<T, H> {
    config: BridgeConfig,
    registry: ComponentRegistry,
    transport: Arc<T>,
    host: Arc<H>,
    listener: Arc<dyn ChannelUpdateListener>,
    slots: RwLock<HashMap<ComponentIdentity, Arc<Mutex<ComponentSlot>>>>,
    routes: RwLock<HashMap<String, Vec<RouteTarget>>>,
}

impl<T, H> DiscoveryDispatcher<T, H>
where
    T: MessageTransport,
    H: HostRegistry,
{
    pub fn new(
        config: BridgeConfig,
        registry: ComponentRegistry,
        transport: Arc<T>,
        host: Arc<H>,
        listener: Arc<dyn ChannelUpdateListener>,
    ) -> Self {
        Self {
            config,
            registry,
            transport,
            host,
            listener,
            slots: RwLock::new(HashMap::new()),
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe the discovery wildcard topics
    pub async fn start(&self) -> Result<()> {
        for topic in self.config.discovery_subscriptions() {
            self.transport.subscribe(&topic).await?;
        }
        info!(
            prefix = %self.config.discovery_prefix,
            "listening for discovery messages"
        );
        Ok(())
    }

    /// Handle an arrival on a discovery topic.
    ///
    /// Errors are also logged here with the offending identity; callers may
    /// ignore the returned error, the dispatcher state is always consistent.
    pub async fn handle_discovery_message(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let parsed = match DiscoveryTopic::parse(&self.config.discovery_prefix, topic) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(topic, error = %err, "not a discovery topic");
                return Err(err);
            }
        };
        let ha_id = parsed.ha_id;

        if !self.config.should_process_component(&ha_id.component) {
            debug!(component = %ha_id.component, "skipping filtered component type");
            return Ok(());
        }

        let identity = ComponentIdentity::new(self.config.thing_id.clone(), ha_id);
        let mut guard = self.locked_slot(&identity).await;

        let result = if payload.is_empty() {
            self.remove_component(&identity, &mut guard).await
        } else {
            self.apply_config(&identity, payload, &mut guard).await
        };

        drop(guard);
        self.drop_slot_if_empty(&identity).await;

        if let Err(err) = &result {
            warn!(identity = %identity, error = %err, "discovery message rejected");
        }
        result
    }

    /// Route a runtime state message to the channels and availability records
    /// subscribed to its topic. Decode failures drop the single message and
    /// keep the last-known value.
    pub async fn handle_state_message(&self, topic: &str, payload: &[u8]) {
        let targets = {
            let routes = self.routes.read().await;
            match routes.get(topic) {
                Some(targets) => targets.clone(),
                None => {
                    debug!(topic, "state message for unrouted topic");
                    return;
                }
            }
        };

        for target in targets {
            match target {
                RouteTarget::Channel(channel) => {
                    match channel.handle_state_message(payload, self.listener.as_ref()) {
                        Ok(Some(value)) => {
                            debug!(channel = %channel.id(), %value, "channel updated")
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(channel = %channel.id(), error = %err, "message dropped")
                        }
                    }
                }
                RouteTarget::Availability(component) => {
                    if let Some(availability) = component.availability() {
                        match availability.handle_message(payload) {
                            Some(online) => {
                                info!(identity = %component.identity(), online, "availability changed")
                            }
                            None => warn!(
                                identity = %component.identity(),
                                "unrecognized availability payload ignored"
                            ),
                        }
                    }
                }
            }
        }
    }

    /// Encode a command and publish it on the channel's command topic
    pub async fn send_command(
        &self,
        identity: &ComponentIdentity,
        role: &str,
        value: &Value,
    ) -> Result<()> {
        let component = self
            .component(identity)
            .await
            .ok_or_else(|| BridgeError::CommandNotSupported {
                channel: format!("{identity}#{role}"),
            })?;
        let channel = component
            .channel(role)
            .ok_or_else(|| BridgeError::CommandNotSupported {
                channel: format!("{identity}#{role}"),
            })?;
        channel.send_command(value, self.transport.as_ref()).await
    }

    /// The active component for `identity`, if any
    pub async fn component(&self, identity: &ComponentIdentity) -> Option<Arc<Component>> {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(identity)?.clone()
        };
        let guard = slot.lock().await;
        guard.component.clone()
    }

    /// All active components
    pub async fn components(&self) -> Vec<Arc<Component>> {
        let slots: Vec<_> = {
            let map = self.slots.read().await;
            map.values().cloned().collect()
        };
        let mut components = Vec::new();
        for slot in slots {
            if let Some(component) = slot.lock().await.component.clone() {
                components.push(component);
            }
        }
        components
    }

    pub async fn component_count(&self) -> usize {
        self.components().await.len()
    }

    /// Tear down every active component and withdraw it from the host
    pub async fn shutdown(&self) {
        let identities: Vec<_> = {
            let slots = self.slots.read().await;
            slots.keys().cloned().collect()
        };
        for identity in identities {
            let mut guard = self.locked_slot(&identity).await;
            if let Err(err) = self.remove_component(&identity, &mut guard).await {
                warn!(identity = %identity, error = %err, "teardown failed");
            }
            drop(guard);
            self.drop_slot_if_empty(&identity).await;
        }
    }

    async fn slot(&self, identity: &ComponentIdentity) -> Arc<Mutex<ComponentSlot>> {
        let mut slots = self.slots.write().await;
        slots
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ComponentSlot::default())))
            .clone()
    }

    /// Lock the slot registered for `identity`. A concurrent reap can swap
    /// the map entry between fetching the slot and acquiring its mutex, so
    /// after locking the slot is checked to still be the registered one;
    /// otherwise the fetch is retried against the current map.
    async fn locked_slot(&self, identity: &ComponentIdentity) -> OwnedMutexGuard<ComponentSlot> {
        loop {
            let slot = self.slot(identity).await;
            let guard = Arc::clone(&slot).lock_owned().await;
            let slots = self.slots.read().await;
            if slots
                .get(identity)
                .map_or(false, |current| Arc::ptr_eq(current, &slot))
            {
                return guard;
            }
        }
    }

    /// Collapse Removed back to Unknown: drop the slot once no component is
    /// left in it. Emptiness is checked and the entry removed under the same
    /// outer write lock; try_lock keeps that lock from waiting on a slot.
    async fn drop_slot_if_empty(&self, identity: &ComponentIdentity) {
        let mut slots = self.slots.write().await;
        let empty = slots
            .get(identity)
            .and_then(|slot| slot.try_lock().ok())
            .map_or(false, |guard| guard.component.is_none());
        if empty {
            slots.remove(identity);
        }
    }

    /// Build (or atomically replace) the component for `identity`
    async fn apply_config(
        &self,
        identity: &ComponentIdentity,
        payload: &[u8],
        slot: &mut ComponentSlot,
    ) -> Result<()> {
        if slot.component.is_some() && slot.config_payload == payload {
            debug!(identity = %identity, "identical discovery payload redelivered, nothing to do");
            return Ok(());
        }

        let raw: JsonValue = serde_json::from_slice(payload)?;
        let component = Arc::new(build_component(
            &self.registry,
            &identity.ha_id.component,
            &raw,
            identity.clone(),
        )?);

        // Replacement is atomic from here on: the new component exists before
        // the old one is touched, and a build failure has already returned
        // without side effects.
        if let Some(old) = slot.component.take() {
            self.retire(&old).await;
        }

        self.add_routes(&component).await;
        for topic in component.subscription_topics() {
            if let Err(err) = self.transport.subscribe(&topic).await {
                // Transient; the transport collaborator re-establishes
                // subscriptions on reconnect and the request is reissue-safe.
                warn!(identity = %identity, %topic, error = %err, "subscribe failed");
            }
        }
        if let Err(err) = self.host.register_component(&component).await {
            // Leave the identity Unknown rather than half-registered; the
            // retained discovery message will drive a clean rebuild.
            self.retire(&component).await;
            return Err(err);
        }

        info!(
            identity = %identity,
            name = component.name(),
            channels = component.channels().len(),
            "component active"
        );

        slot.component = Some(component);
        slot.config_payload = payload.to_vec();
        Ok(())
    }

    /// Empty payload: remove the component, withdraw it and return the
    /// identity to Unknown
    async fn remove_component(
        &self,
        identity: &ComponentIdentity,
        slot: &mut ComponentSlot,
    ) -> Result<()> {
        let Some(component) = slot.component.take() else {
            debug!(identity = %identity, "removal for unknown identity ignored");
            return Ok(());
        };
        slot.config_payload.clear();

        self.retire(&component).await;
        self.host.withdraw_component(identity).await?;
        info!(identity = %identity, "component removed");
        Ok(())
    }

    /// Tear down a component: stop listener invocations, drop its routes and
    /// unsubscribe its topics
    async fn retire(&self, component: &Arc<Component>) {
        component.tear_down();
        self.remove_routes(component).await;
        for topic in component.subscription_topics() {
            if let Err(err) = self.transport.unsubscribe(&topic).await {
                warn!(identity = %component.identity(), %topic, error = %err, "unsubscribe failed");
            }
        }
    }

    async fn add_routes(&self, component: &Arc<Component>) {
        let mut routes = self.routes.write().await;
        for channel in component.channels() {
            if let Some(topic) = channel.state_topic() {
                routes
                    .entry(topic.to_string())
                    .or_default()
                    .push(RouteTarget::Channel(channel.clone()));
            }
        }
        if let Some(availability) = component.availability() {
            routes
                .entry(availability.topic().to_string())
                .or_default()
                .push(RouteTarget::Availability(component.clone()));
        }
    }

    async fn remove_routes(&self, component: &Arc<Component>) {
        let identity = component.identity();
        let mut routes = self.routes.write().await;
        routes.retain(|_, targets| {
            targets.retain(|target| match target {
                RouteTarget::Channel(channel) => &channel.id().component != identity,
                RouteTarget::Availability(owner) => owner.identity() != identity,
            });
            !targets.is_empty()
        });
    }
}

//! Collaborator traits for the transport and host sides
//!
//! The bridge never talks to a broker or a host framework directly. All
//! network-facing work goes through [`MessageTransport`]; everything the host
//! runtime needs to see goes through [`HostRegistry`] and
//! [`ChannelUpdateListener`]. Implementations are expected to be non-blocking
//! or asynchronously dispatched; subscribe and publish requests are idempotent
//! and safe to reissue after a transport failure.

use async_trait::async_trait;

use crate::channel::ChannelId;
use crate::component::{Component, ComponentIdentity};
use crate::error::Result;
use crate::value::Value;

/// Narrow publish/subscribe interface onto the messaging transport
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Request a subscription for `topic`; delivery happens through the
    /// dispatcher's message entry points
    async fn subscribe(&self, topic: &str) -> Result<()>;

    /// Drop the subscription for `topic`
    async fn unsubscribe(&self, topic: &str) -> Result<()>;

    /// Publish a payload. Retry, backoff and delivery confirmation are the
    /// transport's responsibility; the bridge treats this as fire-and-forget.
    async fn publish(&self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<()>;
}

/// Host-side registry of discovered components
#[async_trait]
pub trait HostRegistry: Send + Sync {
    /// Expose a freshly built component (and its channels) to the host
    async fn register_component(&self, component: &Component) -> Result<()>;

    /// Withdraw a removed component from the host
    async fn withdraw_component(&self, identity: &ComponentIdentity) -> Result<()>;
}

/// Change notification for channel values
///
/// Invoked synchronously on the message delivery path; implementors must not
/// perform long-running work here and should hand off to the host
/// asynchronously.
pub trait ChannelUpdateListener: Send + Sync {
    fn channel_value_changed(&self, channel: &ChannelId, value: &Value);
}

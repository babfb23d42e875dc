//! Home Assistant MQTT discovery bridge
//!
//! This crate translates the vendor-neutral Home Assistant MQTT discovery
//! convention into live, typed, bidirectional channels for a host automation
//! runtime. Discovery payloads are classified by component type, validated
//! and defaulted against per-type schema descriptors, and turned into
//! components owning one or more topic-bound channels. Runtime state
//! messages flow through per-channel codecs to a host listener; host
//! commands flow back out as publish requests.
//!
//! The messaging transport and the host framework stay outside: both are
//! narrow traits ([`transport::MessageTransport`], [`transport::HostRegistry`],
//! [`transport::ChannelUpdateListener`]) the embedding application
//! implements.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hass_mqtt_bridge::{
//!     BridgeConfig, ComponentRegistry, DiscoveryDispatcher,
//! };
//! # use hass_mqtt_bridge::transport::{ChannelUpdateListener, HostRegistry, MessageTransport};
//! # async fn run(
//! #     transport: Arc<impl MessageTransport + 'static>,
//! #     host: Arc<impl HostRegistry + 'static>,
//! #     listener: Arc<dyn ChannelUpdateListener>,
//! # ) -> hass_mqtt_bridge::Result<()> {
//! let dispatcher = DiscoveryDispatcher::new(
//!     BridgeConfig::from_env(),
//!     ComponentRegistry::with_builtin(),
//!     transport,
//!     host,
//!     listener,
//! );
//! dispatcher.start().await?;
//! // feed broker messages into the dispatcher:
//! dispatcher
//!     .handle_discovery_message(
//!         "homeassistant/binary_sensor/door/config",
//!         br#"{"state_topic": "home/door"}"#,
//!     )
//!     .await?;
//! dispatcher.handle_state_message("home/door", b"ON").await;
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod channel;
pub mod component;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod transport;
pub mod value;

// Test support modules - available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export main types for convenience
pub use channel::{ChannelId, ComponentChannel};
pub use component::{Component, ComponentIdentity, ComponentRegistry, HaId};
pub use config::BridgeConfig;
pub use discovery::DiscoveryDispatcher;
pub use error::{BridgeError, Result};
pub use value::{Value, ValueCodec};

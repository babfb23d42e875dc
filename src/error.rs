//! Error types for the Home Assistant MQTT bridge
//!
//! Configuration errors abort construction of the single offending component
//! and never affect other identities. Decode errors drop one message and keep
//! the last-known channel value. Transport errors are transient; subscribe and
//! publish requests are idempotent and safe to reissue.

use thiserror::Error;

use crate::value::DecodeError;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error taxonomy for the component-to-channel translation engine
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Discovery payload carried a component type tag no descriptor is
    /// registered for
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    /// A required configuration field was absent from the discovery payload
    #[error("Component {component}: missing required field '{field}'")]
    MissingField { component: String, field: String },

    /// A configuration combination the component type cannot support
    #[error("Component {component}: unsupported configuration ({constraint})")]
    UnsupportedConfiguration {
        component: String,
        constraint: String,
    },

    /// Payload could not be decoded into the channel's value domain
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Surfaced from the transport collaborator, treated as transient
    #[error("Transport error: {0}")]
    Transport(String),

    /// Command sent to a channel without a configured command topic
    #[error("Channel {channel} does not accept commands (no command topic)")]
    CommandNotSupported { channel: String },

    /// Topic did not match the discovery convention
    #[error("Invalid discovery topic: {0}")]
    InvalidDiscoveryTopic(String),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl BridgeError {
    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        BridgeError::Transport(msg.into())
    }

    /// Create an unknown-component-type error
    pub fn unknown_component<S: Into<String>>(type_tag: S) -> Self {
        BridgeError::UnknownComponentType(type_tag.into())
    }

    /// Create a missing-field error naming the offending field
    pub fn missing_field<C: Into<String>, F: Into<String>>(component: C, field: F) -> Self {
        BridgeError::MissingField {
            component: component.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported-configuration error naming the violated constraint
    pub fn unsupported_configuration<C: Into<String>, P: Into<String>>(
        component: C,
        constraint: P,
    ) -> Self {
        BridgeError::UnsupportedConfiguration {
            component: component.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid-discovery-topic error
    pub fn invalid_topic<S: Into<String>>(topic: S) -> Self {
        BridgeError::InvalidDiscoveryTopic(topic.into())
    }

    /// Whether this error stems from component configuration and should be
    /// surfaced to the operator alongside the offending identity
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownComponentType(_)
                | BridgeError::MissingField { .. }
                | BridgeError::UnsupportedConfiguration { .. }
                | BridgeError::Json(_)
        )
    }

    /// Whether the failed operation is safe to reissue
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Transport(_))
    }
}

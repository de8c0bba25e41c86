// MIT License - Copyright (c) 2021 TJForc

use crate::device::ControlCall;

/// All errors that can occur in the panel bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Device call {call} failed: {reason}")]
    DeviceCall { call: ControlCall, reason: String },

    #[error("Device connection lost")]
    Disconnected,

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BridgeError {
    /// Build a device-call failure from any displayable cause.
    pub fn device_call(call: ControlCall, reason: impl std::fmt::Display) -> Self {
        BridgeError::DeviceCall {
            call,
            reason: reason.to_string(),
        }
    }

    /// Whether a later attempt at the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::DeviceCall { .. } | BridgeError::Disconnected | BridgeError::Mqtt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

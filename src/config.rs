// MIT License - Copyright (c) 2021 TJForc

use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Schedule used when confirming an arm/disarm command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (default: 12)
    pub max_attempts: u32,
    /// Delay before every attempt after the first (default: 10s)
    pub retry_delay: Duration,
    /// Wait between issuing a call and reading back the mode (default: 1s)
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            retry_delay: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay preceding the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.retry_delay
        }
    }

    /// Longest time a single reconciliation can take.
    pub fn worst_case(&self) -> Duration {
        let retries = self.max_attempts.saturating_sub(1);
        self.retry_delay * retries + self.settle_delay * self.max_attempts
    }
}

/// Names and ids that place the panel in the MQTT topic tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Cloud location id
    pub location_id: String,
    /// Human readable location name, used in entity names
    pub location_name: String,
    /// Stable id of the security panel device
    pub device_id: String,
    /// Root of the bridge's own topics (default: "ring")
    pub topic_prefix: String,
    /// Home Assistant discovery prefix (default: "homeassistant")
    pub discovery_prefix: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            location_id: "location".to_string(),
            location_name: "Home".to_string(),
            device_id: "security-panel".to_string(),
            topic_prefix: "ring".to_string(),
            discovery_prefix: "homeassistant".to_string(),
        }
    }
}

impl DeviceIdentity {
    /// Base topic for every surface of this panel.
    pub fn device_topic(&self) -> String {
        format!("{}/{}/alarm/{}", self.topic_prefix, self.location_id, self.device_id)
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/status", self.device_topic())
    }

    /// Topic Home Assistant announces its own online/offline state on.
    pub fn hub_status_topic(&self) -> String {
        format!("{}/status", self.discovery_prefix)
    }
}

/// Configuration for bridging one security panel.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    pub identity: DeviceIdentity,
    /// Whether to expose the police and fire panic switches
    pub enable_panic: bool,
    pub retry: RetryPolicy,
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Reject configurations that would produce unusable topics.
    pub fn validate(&self) -> Result<()> {
        let id = &self.identity;
        for (field, value) in [
            ("location_id", &id.location_id),
            ("device_id", &id.device_id),
            ("topic_prefix", &id.topic_prefix),
            ("discovery_prefix", &id.discovery_prefix),
        ] {
            if value.is_empty() {
                return Err(BridgeError::InvalidConfig {
                    details: format!("{field} must not be empty"),
                });
            }
            if value.contains(['+', '#']) {
                return Err(BridgeError::InvalidConfig {
                    details: format!("{field} must not contain MQTT wildcards: {value}"),
                });
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(BridgeError::InvalidConfig {
                details: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn location_id(mut self, id: impl Into<String>) -> Self {
        self.config.identity.location_id = id.into();
        self
    }

    pub fn location_name(mut self, name: impl Into<String>) -> Self {
        self.config.identity.location_name = name.into();
        self
    }

    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.identity.device_id = id.into();
        self
    }

    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.identity.topic_prefix = prefix.into();
        self
    }

    pub fn discovery_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.identity.discovery_prefix = prefix.into();
        self
    }

    pub fn enable_panic(mut self, enable: bool) -> Self {
        self.config.enable_panic = enable;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.retry_delay = delay;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.retry.settle_delay = delay;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

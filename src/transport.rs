// MIT License - Copyright (c) 2021 TJForc

use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};
use serde::Serialize;

use crate::error::Result;

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    /// Retained messages are replayed to late subscribers.
    pub retain: bool,
}

impl OutboundMessage {
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: true,
        }
    }

    pub fn json(topic: impl Into<String>, payload: &impl Serialize, retain: bool) -> Result<Self> {
        Ok(Self {
            topic: topic.into(),
            payload: serde_json::to_string(payload)?,
            retain,
        })
    }
}

/// Publish/subscribe side of the MQTT connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, message: OutboundMessage) -> Result<()>;

    async fn subscribe(&self, topic: &str) -> Result<()>;
}

#[async_trait]
impl Transport for AsyncClient {
    async fn publish(&self, message: OutboundMessage) -> Result<()> {
        AsyncClient::publish(
            self,
            message.topic,
            QoS::AtLeastOnce,
            message.retain,
            message.payload,
        )
        .await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        AsyncClient::subscribe(self, topic, QoS::AtLeastOnce).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        now: u64,
        op: &'static str,
    }

    #[test]
    fn test_json_message() {
        let msg = OutboundMessage::json("a/b", &Sample { now: 1, op: "X" }, false).unwrap();
        assert_eq!(msg.topic, "a/b");
        assert_eq!(msg.payload, r#"{"now":1,"op":"X"}"#);
        assert!(!msg.retain);
    }

    #[test]
    fn test_retained_message() {
        let msg = OutboundMessage::retained("a/b", "ON");
        assert!(msg.retain);
        assert_eq!(msg.payload, "ON");
    }
}

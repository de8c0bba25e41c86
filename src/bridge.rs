// MIT License - Copyright (c) 2021 TJForc

//! Connects a [`PanelDevice`] to MQTT: registration, state publication and
//! inbound command handling.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, Instrument, Span};

use crate::classify::{PanelReport, SwitchState};
use crate::config::{BridgeConfig, DeviceIdentity};
use crate::device::PanelDevice;
use crate::discovery::{
    build_descriptors, info_descriptor, info_state_topic, Surface, PAYLOAD_AVAILABLE,
    PAYLOAD_NOT_AVAILABLE,
};
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::Result;
use crate::state::PanelState;
use crate::transport::{OutboundMessage, Transport};

/// Payload Home Assistant sends on its status topic after (re)starting.
pub const HUB_ONLINE: &str = "online";

// Info sensor: {now, alarmState, batteryLevel?, tamperStatus?}
#[derive(Debug, Serialize)]
struct InfoAttributes<'a> {
    now: u64,
    #[serde(rename = "alarmState")]
    alarm_state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none", rename = "batteryLevel")]
    battery_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "tamperStatus")]
    tamper_status: Option<&'a str>,
}

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Retained state messages for one classified snapshot.
pub fn state_messages(identity: &DeviceIdentity, report: &PanelReport) -> Vec<OutboundMessage> {
    let mut messages = vec![
        OutboundMessage::retained(Surface::Alarm.state_topic(identity), report.alarm.as_str()),
        OutboundMessage::retained(Surface::Siren.state_topic(identity), report.siren.as_str()),
    ];
    if let Some(panic) = report.panic {
        messages.push(switch_message(identity, Surface::Police, panic.police));
        messages.push(switch_message(identity, Surface::Fire, panic.fire));
    }
    messages
}

fn switch_message(identity: &DeviceIdentity, surface: Surface, state: SwitchState) -> OutboundMessage {
    OutboundMessage::retained(surface.state_topic(identity), state.as_str())
}

/// JSON attributes for the info sensor.
pub fn info_message(identity: &DeviceIdentity, state: &PanelState) -> Result<OutboundMessage> {
    let attributes = InfoAttributes {
        now: now_epoch_ms(),
        alarm_state: state.alarm_state().filter(|s| !s.is_empty()).unwrap_or("all-clear"),
        battery_level: state.battery_level,
        tamper_status: state.tamper_status.as_deref(),
    };
    OutboundMessage::json(info_state_topic(identity), &attributes, true)
}

/// Discovery config for every surface plus the info sensor.
pub fn discovery_messages(config: &BridgeConfig) -> Result<Vec<OutboundMessage>> {
    build_descriptors(&config.identity, config.enable_panic)
        .into_iter()
        .chain(std::iter::once(info_descriptor(&config.identity)))
        .map(|d| OutboundMessage::json(d.config_topic, &d.config, true))
        .collect()
}

pub fn availability_message(identity: &DeviceIdentity, online: bool) -> OutboundMessage {
    let payload = if online { PAYLOAD_AVAILABLE } else { PAYLOAD_NOT_AVAILABLE };
    OutboundMessage::retained(identity.availability_topic(), payload)
}

/// One bridged security panel.
pub struct Bridge {
    config: BridgeConfig,
    device: Arc<dyn PanelDevice>,
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    span: Span,
}

impl Bridge {
    pub fn new(config: BridgeConfig, device: Arc<dyn PanelDevice>, transport: Arc<dyn Transport>) -> Self {
        let span = tracing::info_span!(
            "panel",
            location = %config.identity.location_name,
            device_id = %config.identity.device_id
        );
        let dispatcher = Dispatcher::new(&config, Arc::clone(&device), span.clone());
        Self {
            config,
            device,
            transport,
            dispatcher,
            span,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Command topics plus Home Assistant's status topic.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = self.dispatcher.command_topics();
        topics.push(self.config.identity.hub_status_topic());
        topics
    }

    pub async fn subscribe(&self) -> Result<()> {
        for topic in self.subscriptions() {
            self.transport.subscribe(&topic).await?;
            debug!("MQTT: subscribed to {topic}");
        }
        Ok(())
    }

    async fn publish_all(&self, messages: Vec<OutboundMessage>) -> Result<()> {
        for message in messages {
            self.transport.publish(message).await?;
        }
        Ok(())
    }

    /// Advertise all surfaces, mark the panel online and publish current state.
    /// Safe to repeat.
    pub async fn register(&self) -> Result<()> {
        async {
            info!("Publishing discovery for {} surfaces", Surface::enabled(self.config.enable_panic).len());
            self.publish_all(discovery_messages(&self.config)?).await?;
            self.transport
                .publish(availability_message(&self.config.identity, true))
                .await?;
            self.publish_state(&self.device.state()).await
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn publish_state(&self, state: &PanelState) -> Result<()> {
        let report = PanelReport::from_state(state, self.config.enable_panic);
        debug!(alarm = %report.alarm, siren = %report.siren, "Publishing panel state");
        let mut messages = state_messages(&self.config.identity, &report);
        messages.push(info_message(&self.config.identity, state)?);
        self.publish_all(messages).await
    }

    /// Handle one inbound publish. Returns `None` for hub status messages.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> Option<Dispatch> {
        let payload = String::from_utf8_lossy(payload);

        if topic == self.config.identity.hub_status_topic() {
            if payload == HUB_ONLINE {
                info!(parent: &self.span, "Home Assistant came online, re-publishing discovery");
                if let Err(e) = self.register().await {
                    error!(parent: &self.span, "Re-registration failed: {e}");
                }
            }
            return None;
        }

        debug!(parent: &self.span, "MQTT command received on {topic}: {payload}");
        Some(self.dispatcher.dispatch(topic, &payload))
    }

    /// Publish state on every device update until the device goes away.
    pub async fn run_state_updates(&self) {
        let mut rx = self.device.subscribe();
        async {
            loop {
                let state = rx.borrow_and_update().clone();
                if let Err(e) = self.publish_state(&state).await {
                    error!("Failed to publish panel state: {e}");
                }
                if rx.changed().await.is_err() {
                    info!("Device state channel closed");
                    break;
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

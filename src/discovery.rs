// MIT License - Copyright (c) 2021 TJForc

//! Home Assistant MQTT discovery descriptors for the panel's surfaces.

use std::fmt;

use serde::Serialize;

use crate::config::DeviceIdentity;

pub const PAYLOAD_AVAILABLE: &str = "online";
pub const PAYLOAD_NOT_AVAILABLE: &str = "offline";

/// One externally addressable switch or panel exposed by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Alarm,
    Siren,
    Police,
    Fire,
}

impl Surface {
    /// Surfaces advertised for the given panic setting, in publish order.
    pub fn enabled(enable_panic: bool) -> &'static [Surface] {
        if enable_panic {
            &[Surface::Alarm, Surface::Siren, Surface::Police, Surface::Fire]
        } else {
            &[Surface::Alarm, Surface::Siren]
        }
    }

    /// Topic segment under the device topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alarm => "alarm",
            Self::Siren => "siren",
            Self::Police => "police",
            Self::Fire => "fire",
        }
    }

    /// Home Assistant component type.
    pub fn component(&self) -> &'static str {
        match self {
            Self::Alarm => "alarm_control_panel",
            Self::Siren | Self::Police | Self::Fire => "switch",
        }
    }

    pub fn display_name(&self, location_name: &str) -> String {
        match self {
            Self::Alarm => format!("{location_name} Alarm"),
            Self::Siren => format!("{location_name} Siren"),
            Self::Police => format!("{location_name} Panic - Police"),
            Self::Fire => format!("{location_name} Panic - Fire"),
        }
    }

    pub fn unique_id(&self, device_id: &str) -> String {
        match self {
            Self::Alarm => device_id.to_string(),
            other => format!("{device_id}_{}", other.as_str()),
        }
    }

    pub fn state_topic(&self, identity: &DeviceIdentity) -> String {
        format!("{}/{}/state", identity.device_topic(), self.as_str())
    }

    pub fn command_topic(&self, identity: &DeviceIdentity) -> String {
        format!("{}/{}/command", identity.device_topic(), self.as_str())
    }

    pub fn config_topic(&self, identity: &DeviceIdentity) -> String {
        format!(
            "{}/{}/{}/{}/config",
            identity.discovery_prefix,
            self.component(),
            identity.location_id,
            self.unique_id(&identity.device_id)
        )
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device registry block shared by every entity of the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceMetadata {
    pub name: String,
    #[serde(rename = "ids")]
    pub identifiers: Vec<String>,
    #[serde(rename = "mdl")]
    pub model: String,
    #[serde(rename = "mf")]
    pub manufacturer: String,
}

impl DeviceMetadata {
    pub fn for_panel(identity: &DeviceIdentity) -> Self {
        Self {
            name: format!("{} Alarm", identity.location_name),
            identifiers: vec![identity.device_id.clone()],
            model: "Alarm Control Panel".to_string(),
            manufacturer: "Ring".to_string(),
        }
    }
}

/// Discovery config message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityConfig {
    pub name: String,
    pub unique_id: String,
    pub availability_topic: String,
    pub payload_available: &'static str,
    pub payload_not_available: &'static str,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
    pub device: DeviceMetadata,
}

/// A discovery message together with the topic it is published on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// `None` for the info sensor, which has no command channel.
    pub surface: Option<Surface>,
    pub config_topic: String,
    pub config: EntityConfig,
}

fn surface_descriptor(surface: Surface, identity: &DeviceIdentity, device: &DeviceMetadata) -> Descriptor {
    Descriptor {
        surface: Some(surface),
        config_topic: surface.config_topic(identity),
        config: EntityConfig {
            name: surface.display_name(&identity.location_name),
            unique_id: surface.unique_id(&identity.device_id),
            availability_topic: identity.availability_topic(),
            payload_available: PAYLOAD_AVAILABLE,
            payload_not_available: PAYLOAD_NOT_AVAILABLE,
            state_topic: surface.state_topic(identity),
            command_topic: Some(surface.command_topic(identity)),
            json_attributes_topic: None,
            value_template: None,
            device: device.clone(),
        },
    }
}

/// Descriptors for every control surface of the panel.
///
/// Always alarm and siren; police and fire only with `enable_panic`.
/// Calling this repeatedly yields equal output, so re-registration is safe.
pub fn build_descriptors(identity: &DeviceIdentity, enable_panic: bool) -> Vec<Descriptor> {
    let device = DeviceMetadata::for_panel(identity);
    Surface::enabled(enable_panic)
        .iter()
        .map(|surface| surface_descriptor(*surface, identity, &device))
        .collect()
}

pub fn info_state_topic(identity: &DeviceIdentity) -> String {
    format!("{}/info/state", identity.device_topic())
}

/// Diagnostic sensor carrying the raw alarm state and battery/tamper attributes.
pub fn info_descriptor(identity: &DeviceIdentity) -> Descriptor {
    let topic = info_state_topic(identity);
    Descriptor {
        surface: None,
        config_topic: format!(
            "{}/sensor/{}/{}_info/config",
            identity.discovery_prefix, identity.location_id, identity.device_id
        ),
        config: EntityConfig {
            name: format!("{} Alarm Info", identity.location_name),
            unique_id: format!("{}_info", identity.device_id),
            availability_topic: identity.availability_topic(),
            payload_available: PAYLOAD_AVAILABLE,
            payload_not_available: PAYLOAD_NOT_AVAILABLE,
            state_topic: topic.clone(),
            command_topic: None,
            json_attributes_topic: Some(topic),
            value_template: Some("{{ value_json[\"alarmState\"] }}".to_string()),
            device: DeviceMetadata::for_panel(identity),
        },
    }
}

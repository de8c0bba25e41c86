// Wire shape of the discovery messages as Home Assistant sees them.

use serde_json::{json, Value};

use panel_bridge::bridge::discovery_messages;
use panel_bridge::{build_descriptors, BridgeConfig, DeviceIdentity, Surface};

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        location_id: "loc1".to_string(),
        location_name: "Beach House".to_string(),
        device_id: "dev1".to_string(),
        ..DeviceIdentity::default()
    }
}

fn payload(value: &impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap()
}

#[test]
fn alarm_panel_config_payload() {
    let descriptors = build_descriptors(&identity(), false);

    assert_eq!(descriptors[0].config_topic, "homeassistant/alarm_control_panel/loc1/dev1/config");
    assert_eq!(
        payload(&descriptors[0].config),
        json!({
            "name": "Beach House Alarm",
            "unique_id": "dev1",
            "availability_topic": "ring/loc1/alarm/dev1/status",
            "payload_available": "online",
            "payload_not_available": "offline",
            "state_topic": "ring/loc1/alarm/dev1/alarm/state",
            "command_topic": "ring/loc1/alarm/dev1/alarm/command",
            "device": {
                "name": "Beach House Alarm",
                "ids": ["dev1"],
                "mdl": "Alarm Control Panel",
                "mf": "Ring"
            }
        })
    );
}

#[test]
fn panic_switch_config_payloads() {
    let descriptors = build_descriptors(&identity(), true);
    let fire = descriptors
        .iter()
        .find(|d| d.surface == Some(Surface::Fire))
        .unwrap();

    assert_eq!(fire.config_topic, "homeassistant/switch/loc1/dev1_fire/config");
    let value = payload(&fire.config);
    assert_eq!(value["name"], "Beach House Panic - Fire");
    assert_eq!(value["unique_id"], "dev1_fire");
    assert_eq!(value["state_topic"], "ring/loc1/alarm/dev1/fire/state");
    assert_eq!(value["command_topic"], "ring/loc1/alarm/dev1/fire/command");
}

#[test]
fn every_surface_shares_device_block() {
    let descriptors = build_descriptors(&identity(), true);
    let first = payload(&descriptors[0].config)["device"].clone();

    for descriptor in &descriptors {
        assert_eq!(payload(&descriptor.config)["device"], first);
    }
}

#[test]
fn info_sensor_has_no_command_topic() {
    let config = BridgeConfig {
        identity: identity(),
        ..BridgeConfig::default()
    };
    let messages = discovery_messages(&config).unwrap();
    let info = messages.last().unwrap();

    assert_eq!(info.topic, "homeassistant/sensor/loc1/dev1_info/config");
    let value: Value = serde_json::from_str(&info.payload).unwrap();
    assert!(value.get("command_topic").is_none());
    assert_eq!(value["json_attributes_topic"], "ring/loc1/alarm/dev1/info/state");
    assert_eq!(value["value_template"], "{{ value_json[\"alarmState\"] }}");
}

#[test]
fn custom_prefixes_flow_into_topics() {
    let identity = DeviceIdentity {
        topic_prefix: "bridge".to_string(),
        discovery_prefix: "ha".to_string(),
        ..identity()
    };
    let descriptors = build_descriptors(&identity, false);

    assert_eq!(descriptors[1].config_topic, "ha/switch/loc1/dev1_siren/config");
    assert_eq!(descriptors[1].config.state_topic, "bridge/loc1/alarm/dev1/siren/state");
    assert_eq!(descriptors[1].config.availability_topic, "bridge/loc1/alarm/dev1/status");
}

// Bridge behaviour against a recording transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::RecordingTransport;
use panel_bridge::{
    ArmingMode, Bridge, BridgeConfig, Dispatch, PanelDevice, PanelState, ReconcileOutcome,
    SimulatedPanel,
};

fn config(enable_panic: bool) -> BridgeConfig {
    BridgeConfig::builder()
        .location_id("loc1")
        .location_name("Home")
        .device_id("dev1")
        .enable_panic(enable_panic)
        .build()
}

fn setup(enable_panic: bool, lag: Duration) -> (Arc<Bridge>, Arc<SimulatedPanel>, Arc<RecordingTransport>) {
    let panel = Arc::new(SimulatedPanel::new(PanelState::with_mode(ArmingMode::None), lag));
    let transport = Arc::new(RecordingTransport::default());
    let bridge = Arc::new(Bridge::new(config(enable_panic), panel.clone(), transport.clone()));
    (bridge, panel, transport)
}

#[tokio::test]
async fn subscribes_to_command_and_hub_topics() {
    let (bridge, _panel, transport) = setup(true, Duration::ZERO);

    bridge.subscribe().await.unwrap();

    assert_eq!(
        transport.subscribed(),
        vec![
            "ring/loc1/alarm/dev1/alarm/command",
            "ring/loc1/alarm/dev1/fire/command",
            "ring/loc1/alarm/dev1/police/command",
            "ring/loc1/alarm/dev1/siren/command",
            "homeassistant/status",
        ]
    );
}

#[tokio::test]
async fn register_publishes_discovery_availability_and_state() {
    let (bridge, _panel, transport) = setup(false, Duration::ZERO);

    bridge.register().await.unwrap();

    let topics: Vec<String> = transport.published().into_iter().map(|m| m.topic).collect();
    assert_eq!(
        topics,
        vec![
            "homeassistant/alarm_control_panel/loc1/dev1/config",
            "homeassistant/switch/loc1/dev1_siren/config",
            "homeassistant/sensor/loc1/dev1_info/config",
            "ring/loc1/alarm/dev1/status",
            "ring/loc1/alarm/dev1/alarm/state",
            "ring/loc1/alarm/dev1/siren/state",
            "ring/loc1/alarm/dev1/info/state",
        ]
    );
    assert!(transport.published().iter().all(|m| m.retain));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/status").as_deref(), Some("online"));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/alarm/state").as_deref(), Some("disarmed"));
}

#[tokio::test]
async fn hub_restart_repeats_identical_discovery() {
    let (bridge, _panel, transport) = setup(true, Duration::ZERO);
    bridge.register().await.unwrap();
    let first = transport.published();

    let handled = bridge.handle_message("homeassistant/status", b"online").await;
    assert!(handled.is_none());

    let all = transport.published();
    assert_eq!(all.len(), first.len() * 2);
    let config_payloads = |msgs: &[panel_bridge::OutboundMessage]| -> Vec<String> {
        msgs.iter()
            .filter(|m| m.topic.ends_with("/config"))
            .map(|m| m.payload.clone())
            .collect()
    };
    assert_eq!(config_payloads(&first), config_payloads(&all[first.len()..]));
}

#[tokio::test]
async fn hub_offline_is_ignored() {
    let (bridge, _panel, transport) = setup(false, Duration::ZERO);

    assert!(bridge.handle_message("homeassistant/status", b"offline").await.is_none());
    assert!(transport.published().is_empty());
}

#[tokio::test(start_paused = true)]
async fn state_changes_are_republished() {
    let (bridge, panel, transport) = setup(true, Duration::ZERO);
    let runner = Arc::clone(&bridge);
    let handle = tokio::spawn(async move { runner.run_state_updates().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/alarm/state").as_deref(), Some("disarmed"));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/fire/state").as_deref(), Some("OFF"));

    panel.push_state(PanelState::with_mode(ArmingMode::All).with_alarm("fire-alarm"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/alarm/state").as_deref(), Some("triggered"));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/fire/state").as_deref(), Some("ON"));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/police/state").as_deref(), Some("OFF"));

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn arm_command_converges_against_slow_panel() {
    // Panel takes 5s to apply the change: the first check at 1s misses, the
    // second attempt at 11s sees it.
    let (bridge, panel, _transport) = setup(false, Duration::from_secs(5));

    let dispatch = bridge
        .handle_message("ring/loc1/alarm/dev1/alarm/command", b"arm_home")
        .await;
    let Some(Dispatch::Reconciling(handle)) = dispatch else {
        panic!("expected reconciliation");
    };

    assert_eq!(handle.await.unwrap(), ReconcileOutcome::Converged { attempts: 2 });
    assert_eq!(panel.state().mode, ArmingMode::Some);
}

#[tokio::test(start_paused = true)]
async fn offline_panel_exhausts_budget() {
    let (bridge, panel, _transport) = setup(false, Duration::ZERO);
    panel.set_offline(true);

    let dispatch = bridge
        .handle_message("ring/loc1/alarm/dev1/alarm/command", b"arm_away")
        .await;
    let Some(Dispatch::Reconciling(handle)) = dispatch else {
        panic!("expected reconciliation");
    };

    assert_eq!(handle.await.unwrap(), ReconcileOutcome::Exhausted { attempts: 12 });
    assert_eq!(panel.state().mode, ArmingMode::None);
}

#[tokio::test]
async fn siren_command_reaches_panel() {
    let (bridge, panel, _transport) = setup(false, Duration::ZERO);

    let dispatch = bridge
        .handle_message("ring/loc1/alarm/dev1/siren/command", b"ON")
        .await;
    let Some(Dispatch::Issued(_, handle)) = dispatch else {
        panic!("expected an issued call");
    };
    handle.await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(panel.state().siren.map(|s| s.state).as_deref(), Some("on"));
}

#[tokio::test(start_paused = true)]
async fn burglar_alarm_publishes_both_panic_switches() {
    let (bridge, panel, transport) = setup(true, Duration::ZERO);
    let runner = Arc::clone(&bridge);
    let handle = tokio::spawn(async move { runner.run_state_updates().await });

    panel.push_state(PanelState::with_mode(ArmingMode::All).with_alarm("burglar-alarm"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/police/state").as_deref(), Some("ON"));
    assert_eq!(transport.last_on("ring/loc1/alarm/dev1/fire/state").as_deref(), Some("ON"));

    handle.abort();
}

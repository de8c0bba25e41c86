//! Example: Drive a simulated panel through the command dispatcher and print
//! every classified state change. No MQTT broker needed.

use std::sync::Arc;
use std::time::Duration;

use panel_bridge::{
    ArmingMode, BridgeConfig, Dispatch, Dispatcher, PanelDevice, PanelReport, PanelState,
    SimulatedPanel, Surface,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = BridgeConfig::builder()
        .location_id("demo")
        .location_name("Demo")
        .device_id("panel-1")
        .enable_panic(true)
        .retry_delay(Duration::from_secs(2))
        .build();
    config.validate()?;

    let panel = Arc::new(SimulatedPanel::new(
        PanelState::with_mode(ArmingMode::None),
        Duration::from_secs(3),
    ));
    let dispatcher = Dispatcher::new(&config, panel.clone(), tracing::info_span!("demo"));

    let mut states = panel.subscribe();
    let enable_panic = config.enable_panic;
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let report = PanelReport::from_state(&states.borrow_and_update(), enable_panic);
            println!("State: {report:?}");
        }
    });

    let alarm = Surface::Alarm.command_topic(&config.identity);
    let fire = Surface::Fire.command_topic(&config.identity);

    for (topic, payload) in [(&alarm, "arm_away"), (&fire, "ON"), (&fire, "OFF"), (&alarm, "disarm")] {
        println!("\n> {topic} {payload}");
        match dispatcher.dispatch(topic, payload) {
            Dispatch::Reconciling(handle) => println!("Outcome: {:?}", handle.await?),
            Dispatch::Issued(call, handle) => {
                handle.await?;
                println!("Issued {call}");
                tokio::time::sleep(Duration::from_secs(4)).await;
            }
            other => println!("Not handled: {other:?}"),
        }
    }

    Ok(())
}

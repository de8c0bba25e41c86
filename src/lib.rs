// MIT License - Copyright (c) 2021 TJForc
//
//! # panel-bridge
//!
//! Bridges a cloud-managed security panel to Home Assistant over MQTT.
//!
//! The panel's arming mode, siren and panic state are classified into Home
//! Assistant's vocabulary and published as retained messages. Commands
//! arriving on the command topics are turned into device calls; arming
//! commands are confirmed by polling the panel state, since the cloud never
//! acknowledges them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use panel_bridge::{Bridge, BridgeConfig, PanelState, SimulatedPanel};
//! use rumqttc::{AsyncClient, MqttOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .location_id("5f3c")
//!         .location_name("Home")
//!         .device_id("a1b2c3")
//!         .enable_panic(true)
//!         .build();
//!
//!     let (client, mut eventloop) = AsyncClient::new(MqttOptions::new("panel", "localhost", 1883), 64);
//!     let device = Arc::new(SimulatedPanel::new(PanelState::default(), Duration::from_secs(2)));
//!     let bridge = Bridge::new(config, device, Arc::new(client));
//!
//!     bridge.subscribe().await?;
//!     bridge.register().await?;
//!     loop {
//!         eventloop.poll().await?;
//!     }
//! }
//! ```

pub mod bridge;
pub mod classify;
pub mod config;
pub mod device;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod reconcile;
pub mod simulated;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use bridge::Bridge;
pub use classify::{classify, PanelReport, PublishedAlarmMode, SwitchState};
pub use config::{BridgeConfig, BridgeConfigBuilder, DeviceIdentity, RetryPolicy};
pub use device::{ControlCall, PanelDevice};
pub use discovery::{build_descriptors, Descriptor, Surface};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{BridgeError, Result};
pub use reconcile::{ArmCommand, ReconcileOutcome, Reconciler};
pub use simulated::SimulatedPanel;
pub use state::{ArmingMode, PanelState};
pub use transport::{OutboundMessage, Transport};

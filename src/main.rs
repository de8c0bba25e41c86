// MIT License - Copyright (c) 2021 TJForc
// MQTT bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use panel_bridge::bridge::availability_message;
use panel_bridge::{ArmingMode, Bridge, BridgeConfig, Dispatch, PanelState, SimulatedPanel};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "panel2mqtt")]
#[command(about = "Bridge between a cloud security panel and Home Assistant over MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    mqtt: MqttToml,
    panel: PanelToml,
    #[serde(default)]
    reconcile: ReconcileToml,
    #[serde(default)]
    simulator: SimulatorToml,
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_topic_prefix")]
    topic_prefix: String,
    #[serde(default = "default_discovery_prefix")]
    discovery_prefix: String,
}

fn default_client_id() -> String {
    "panel2mqtt".to_string()
}
fn default_topic_prefix() -> String {
    "ring".to_string()
}
fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    location_id: String,
    #[serde(default = "default_location_name")]
    location_name: String,
    device_id: String,
    #[serde(default)]
    enable_panic: bool,
}

fn default_location_name() -> String {
    "Home".to_string()
}

#[derive(Debug, Deserialize)]
struct ReconcileToml {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    retry_delay_secs: u64,
    #[serde(default = "default_settle_delay")]
    settle_delay_secs: u64,
}

impl Default for ReconcileToml {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            settle_delay_secs: default_settle_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    12
}
fn default_retry_delay() -> u64 {
    10
}
fn default_settle_delay() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct SimulatorToml {
    #[serde(default = "default_lag")]
    lag_ms: u64,
    #[serde(default = "default_initial_mode")]
    initial_mode: String,
}

impl Default for SimulatorToml {
    fn default() -> Self {
        Self {
            lag_ms: default_lag(),
            initial_mode: default_initial_mode(),
        }
    }
}

fn default_lag() -> u64 {
    2000
}
fn default_initial_mode() -> String {
    "none".to_string()
}

fn build_bridge_config(config: &Config) -> Result<BridgeConfig> {
    let bridge_config = BridgeConfig::builder()
        .location_id(&config.panel.location_id)
        .location_name(&config.panel.location_name)
        .device_id(&config.panel.device_id)
        .enable_panic(config.panel.enable_panic)
        .topic_prefix(&config.mqtt.topic_prefix)
        .discovery_prefix(&config.mqtt.discovery_prefix)
        .max_attempts(config.reconcile.max_attempts)
        .retry_delay(Duration::from_secs(config.reconcile.retry_delay_secs))
        .settle_delay(Duration::from_secs(config.reconcile.settle_delay_secs))
        .build();
    bridge_config.validate()?;
    Ok(bridge_config)
}

fn load_config(path: &str) -> Result<Config> {
    let config_text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&config_text).context("Failed to parse config file")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=panel_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    let mut bridge_config = build_bridge_config(&config)?;
    let (mut mqtt_host, mut mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let initial = PanelState::with_mode(ArmingMode::from_wire(&config.simulator.initial_mode));
        let device = Arc::new(SimulatedPanel::new(
            initial,
            Duration::from_millis(config.simulator.lag_ms),
        ));
        info!(
            "Bridging panel {} at location {} ({})",
            bridge_config.identity.device_id,
            bridge_config.identity.location_name,
            bridge_config.identity.location_id
        );

        // Set up MQTT; the broker marks the panel offline if we drop off
        let offline = availability_message(&bridge_config.identity, false);
        let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        mqtt_opts.set_last_will(LastWill::new(
            offline.topic.clone(),
            offline.payload.clone(),
            QoS::AtLeastOnce,
            true,
        ));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        let bridge = Arc::new(Bridge::new(
            bridge_config.clone(),
            device,
            Arc::new(client.clone()),
        ));

        // Task 1: device state → MQTT
        let bridge_state = Arc::clone(&bridge);
        let state_handle = tokio::spawn(async move {
            bridge_state.run_state_updates().await;
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let bridge_cmds = Arc::clone(&bridge);
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // rumqttc does not auto-resubscribe, so subscribe and
                        // re-register after every broker connect/reconnect.
                        info!("MQTT: connected");
                        if let Err(e) = bridge_cmds.subscribe().await {
                            error!("Failed to subscribe: {e}");
                        }
                        if let Err(e) = bridge_cmds.register().await {
                            error!("Failed to register panel: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        match bridge_cmds.handle_message(&msg.topic, &msg.payload).await {
                            Some(Dispatch::Reconciling(_)) => debug!("Arming command handed to reconciler"),
                            Some(Dispatch::Issued(call, _)) => debug!("Issued {call}"),
                            Some(Dispatch::Rejected(_) | Dispatch::Unrouted) | None => {}
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Wait for a signal
        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting connections...");
                true
            }
        };

        // Mark the panel offline before tearing the connection down
        if let Err(e) = client
            .publish(offline.topic, QoS::AtLeastOnce, true, offline.payload)
            .await
        {
            warn!("Failed to publish offline status: {e}");
        }
        if let Err(e) = client.disconnect().await {
            warn!("Error disconnecting from MQTT: {e}");
        }

        state_handle.abort();
        mqtt_handle.abort();

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match load_config(&cli.config) {
            Ok(new_config) => match build_bridge_config(&new_config) {
                Ok(new_bridge_config) => match parse_mqtt_url(&new_config.mqtt.url) {
                    Ok((new_host, new_port)) => {
                        bridge_config = new_bridge_config;
                        mqtt_host = new_host;
                        mqtt_port = new_port;
                        config = new_config;
                        info!("Config reloaded successfully");
                    }
                    Err(e) => warn!("Invalid MQTT URL in new config, keeping previous: {e}"),
                },
                Err(e) => warn!("Invalid panel config in new config, keeping previous: {e}"),
            },
            Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
        }

        info!("Reconnecting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}

// MIT License - Copyright (c) 2021 TJForc

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn, Span};

use crate::config::BridgeConfig;
use crate::device::{spawn_detached, ControlCall, PanelDevice};
use crate::discovery::Surface;
use crate::reconcile::{ReconcileOutcome, Reconciler};

/// Payload accepted on the siren and panic command topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl SwitchCommand {
    pub fn parse(payload: &str) -> Option<Self> {
        match payload.trim().to_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Device call behind a switch command.
///
/// There is no upstream call that clears only one kind of panic, so both
/// police and fire "off" set the alarm mode back to none.
pub fn switch_call(surface: Surface, command: SwitchCommand) -> Option<ControlCall> {
    match (surface, command) {
        (Surface::Siren, SwitchCommand::On) => Some(ControlCall::SoundSiren),
        (Surface::Siren, SwitchCommand::Off) => Some(ControlCall::SilenceSiren),
        (Surface::Police, SwitchCommand::On) => Some(ControlCall::TriggerBurglarAlarm),
        (Surface::Fire, SwitchCommand::On) => Some(ControlCall::TriggerFireAlarm),
        (Surface::Police | Surface::Fire, SwitchCommand::Off) => Some(ControlCall::ClearAlarm),
        (Surface::Alarm, _) => None,
    }
}

/// What happened to an inbound message.
#[derive(Debug)]
pub enum Dispatch {
    /// Handed to the reconciler, which runs on its own task.
    Reconciling(JoinHandle<ReconcileOutcome>),
    /// A one-shot device call was issued without waiting for it.
    Issued(ControlCall, JoinHandle<()>),
    /// Known topic, payload not understood. Nothing was sent.
    Rejected(Surface),
    /// No surface listens on this topic.
    Unrouted,
}

/// Routes command-topic messages to the reconciler or to a toggle call.
pub struct Dispatcher {
    routes: HashMap<String, Surface>,
    device: Arc<dyn PanelDevice>,
    reconciler: Reconciler,
    span: Span,
}

impl Dispatcher {
    pub fn new(config: &BridgeConfig, device: Arc<dyn PanelDevice>, span: Span) -> Self {
        let routes = Surface::enabled(config.enable_panic)
            .iter()
            .map(|surface| (surface.command_topic(&config.identity), *surface))
            .collect();
        let reconciler = Reconciler::new(Arc::clone(&device), config.retry, span.clone());
        Self {
            routes,
            device,
            reconciler,
            span,
        }
    }

    /// Every topic this dispatcher accepts messages on.
    pub fn command_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.routes.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn surface_for(&self, topic: &str) -> Option<Surface> {
        self.routes.get(topic).copied()
    }

    /// Route a message. Never blocks on the device; must run inside a Tokio runtime.
    pub fn dispatch(&self, topic: &str, payload: &str) -> Dispatch {
        let _enter = self.span.enter();

        let Some(surface) = self.surface_for(topic) else {
            warn!("Received message on unknown command topic {topic}");
            return Dispatch::Unrouted;
        };

        if surface == Surface::Alarm {
            let reconciler = self.reconciler.clone();
            let payload = payload.to_string();
            return Dispatch::Reconciling(tokio::spawn(async move {
                reconciler.reconcile(&payload).await
            }));
        }

        match SwitchCommand::parse(payload).and_then(|command| switch_call(surface, command)) {
            Some(call) => {
                info!("{surface} command {payload}: issuing {call}");
                let handle = spawn_detached(Arc::clone(&self.device), call, self.span.clone());
                Dispatch::Issued(call, handle)
            }
            None => {
                warn!("Received invalid command {payload:?} for {surface}");
                Dispatch::Rejected(surface)
            }
        }
    }
}

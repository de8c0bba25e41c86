// MIT License - Copyright (c) 2021 TJForc

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::device::{ControlCall, PanelDevice};
use crate::error::{BridgeError, Result};
use crate::state::{ArmingMode, PanelState};

/// In-memory panel that applies control calls after a fixed lag.
///
/// Mirrors the cloud's behaviour closely enough to exercise the bridge: calls
/// return immediately and the state changes some time later.
pub struct SimulatedPanel {
    state_tx: Arc<watch::Sender<PanelState>>,
    lag: Duration,
    offline: AtomicBool,
}

impl SimulatedPanel {
    pub fn new(initial: PanelState, lag: Duration) -> Self {
        let (state_tx, _) = watch::channel(initial);
        Self {
            state_tx: Arc::new(state_tx),
            lag,
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every control call fails and the state stays put.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace the state as if the cloud had pushed an update.
    pub fn push_state(&self, state: PanelState) {
        self.state_tx.send_replace(state);
    }

    fn apply(&self, call: ControlCall, update: impl FnOnce(&mut PanelState) + Send + 'static) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::Disconnected);
        }
        debug!("Simulated panel: {call} in {:?}", self.lag);
        let tx = Arc::clone(&self.state_tx);
        let lag = self.lag;
        tokio::spawn(async move {
            tokio::time::sleep(lag).await;
            tx.send_modify(update);
        });
        Ok(())
    }

    fn set_mode(&self, call: ControlCall, mode: ArmingMode) -> Result<()> {
        self.apply(call, move |state| {
            state.mode = mode;
            state.alarm_info = None;
        })
    }
}

#[async_trait]
impl PanelDevice for SimulatedPanel {
    fn state(&self) -> PanelState {
        self.state_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.state_tx.subscribe()
    }

    async fn disarm(&self) -> Result<()> {
        self.set_mode(ControlCall::Disarm, ArmingMode::None)
    }

    async fn arm_home(&self) -> Result<()> {
        self.set_mode(ControlCall::ArmHome, ArmingMode::Some)
    }

    async fn arm_away(&self) -> Result<()> {
        self.set_mode(ControlCall::ArmAway, ArmingMode::All)
    }

    async fn sound_siren(&self) -> Result<()> {
        self.apply(ControlCall::SoundSiren, |state| {
            *state = state.clone().with_siren("on");
        })
    }

    async fn silence_siren(&self) -> Result<()> {
        self.apply(ControlCall::SilenceSiren, |state| {
            *state = state.clone().with_siren("off");
        })
    }

    async fn trigger_burglar_alarm(&self) -> Result<()> {
        self.apply(ControlCall::TriggerBurglarAlarm, |state| {
            *state = state.clone().with_alarm("burglar-alarm");
        })
    }

    async fn trigger_fire_alarm(&self) -> Result<()> {
        self.apply(ControlCall::TriggerFireAlarm, |state| {
            *state = state.clone().with_alarm("fire-alarm");
        })
    }

    async fn set_alarm_mode(&self, mode: ArmingMode) -> Result<()> {
        self.set_mode(ControlCall::ClearAlarm, mode)
    }
}

// MIT License - Copyright (c) 2021 TJForc

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn, Instrument, Span};

use crate::error::Result;
use crate::state::{ArmingMode, PanelState};

/// Control surface of the cloud security panel.
///
/// None of the control calls are acknowledged by the vendor: `Ok(())` only
/// means the request was accepted, and the effect shows up later (if at all)
/// in [`PanelDevice::state`].
#[async_trait]
pub trait PanelDevice: Send + Sync {
    /// Latest locally cached snapshot.
    fn state(&self) -> PanelState;

    /// Receiver that wakes on every state update.
    fn subscribe(&self) -> watch::Receiver<PanelState>;

    async fn disarm(&self) -> Result<()>;
    async fn arm_home(&self) -> Result<()>;
    async fn arm_away(&self) -> Result<()>;
    async fn sound_siren(&self) -> Result<()>;
    async fn silence_siren(&self) -> Result<()>;
    async fn trigger_burglar_alarm(&self) -> Result<()>;
    async fn trigger_fire_alarm(&self) -> Result<()>;
    async fn set_alarm_mode(&self, mode: ArmingMode) -> Result<()>;
}

/// A single call against [`PanelDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCall {
    Disarm,
    ArmHome,
    ArmAway,
    SoundSiren,
    SilenceSiren,
    TriggerBurglarAlarm,
    TriggerFireAlarm,
    /// `set_alarm_mode(none)`; clears police and fire panics alike.
    ClearAlarm,
}

impl ControlCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarm => "disarm",
            Self::ArmHome => "arm_home",
            Self::ArmAway => "arm_away",
            Self::SoundSiren => "sound_siren",
            Self::SilenceSiren => "silence_siren",
            Self::TriggerBurglarAlarm => "trigger_burglar_alarm",
            Self::TriggerFireAlarm => "trigger_fire_alarm",
            Self::ClearAlarm => "set_alarm_mode(none)",
        }
    }

    pub async fn invoke(self, device: &dyn PanelDevice) -> Result<()> {
        match self {
            Self::Disarm => device.disarm().await,
            Self::ArmHome => device.arm_home().await,
            Self::ArmAway => device.arm_away().await,
            Self::SoundSiren => device.sound_siren().await,
            Self::SilenceSiren => device.silence_siren().await,
            Self::TriggerBurglarAlarm => device.trigger_burglar_alarm().await,
            Self::TriggerFireAlarm => device.trigger_fire_alarm().await,
            Self::ClearAlarm => device.set_alarm_mode(ArmingMode::None).await,
        }
    }
}

impl fmt::Display for ControlCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue `call` on its own task and return immediately.
///
/// A failure is only reported through the log. Callers that need to know
/// whether the call had an effect have to watch the device state.
pub fn spawn_detached(device: Arc<dyn PanelDevice>, call: ControlCall, span: Span) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            match call.invoke(device.as_ref()).await {
                Ok(()) => debug!("{call}: request accepted"),
                Err(e) if e.is_retryable() => warn!("{call} failed: {e}"),
                Err(e) => error!("{call} failed permanently: {e}"),
            }
        }
        .instrument(span),
    )
}

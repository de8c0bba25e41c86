// Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use panel_bridge::transport::{OutboundMessage, Transport};
use panel_bridge::{ArmingMode, BridgeError, ControlCall, PanelDevice, PanelState, Result};

/// Panel that records every call and only moves when told to.
pub struct MockPanel {
    state_tx: watch::Sender<PanelState>,
    calls: Mutex<Vec<(ControlCall, Instant)>>,
    /// Apply an arming call's target mode on this 1-based arming call.
    converge_on: Option<usize>,
    fail_calls: bool,
}

impl MockPanel {
    pub fn new(initial: PanelState) -> Self {
        let (state_tx, _) = watch::channel(initial);
        Self {
            state_tx,
            calls: Mutex::new(Vec::new()),
            converge_on: None,
            fail_calls: false,
        }
    }

    /// The panel never reaches any requested mode.
    pub fn stuck() -> Self {
        Self::new(PanelState::with_mode(ArmingMode::None))
    }

    /// The panel applies the requested mode on the `k`th arming call.
    pub fn converging_on(k: usize) -> Self {
        Self {
            converge_on: Some(k),
            ..Self::new(PanelState::with_mode(ArmingMode::None))
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().iter().map(|(call, _)| *call).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    fn record(&self, call: ControlCall, target: Option<ArmingMode>) -> Result<()> {
        let arming_calls = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((call, Instant::now()));
            calls
                .iter()
                .filter(|(c, _)| matches!(c, ControlCall::Disarm | ControlCall::ArmHome | ControlCall::ArmAway))
                .count()
        };
        if let (Some(k), Some(mode)) = (self.converge_on, target)
            && arming_calls == k
        {
            self.state_tx.send_modify(|state| state.mode = mode);
        }
        if self.fail_calls {
            return Err(BridgeError::device_call(call, "HTTP 500"));
        }
        Ok(())
    }
}

#[async_trait]
impl PanelDevice for MockPanel {
    fn state(&self) -> PanelState {
        self.state_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.state_tx.subscribe()
    }

    async fn disarm(&self) -> Result<()> {
        self.record(ControlCall::Disarm, Some(ArmingMode::None))
    }

    async fn arm_home(&self) -> Result<()> {
        self.record(ControlCall::ArmHome, Some(ArmingMode::Some))
    }

    async fn arm_away(&self) -> Result<()> {
        self.record(ControlCall::ArmAway, Some(ArmingMode::All))
    }

    async fn sound_siren(&self) -> Result<()> {
        self.record(ControlCall::SoundSiren, None)
    }

    async fn silence_siren(&self) -> Result<()> {
        self.record(ControlCall::SilenceSiren, None)
    }

    async fn trigger_burglar_alarm(&self) -> Result<()> {
        self.record(ControlCall::TriggerBurglarAlarm, None)
    }

    async fn trigger_fire_alarm(&self) -> Result<()> {
        self.record(ControlCall::TriggerFireAlarm, None)
    }

    async fn set_alarm_mode(&self, mode: ArmingMode) -> Result<()> {
        assert_eq!(mode, ArmingMode::None);
        self.record(ControlCall::ClearAlarm, None)
    }
}

/// Transport that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<OutboundMessage>>,
    subscribed: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }

    /// Last payload published on `topic`.
    pub fn last_on(&self, topic: &str) -> Option<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.topic == topic)
            .map(|m| m.payload.clone())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn publish(&self, message: OutboundMessage) -> Result<()> {
        self.published.lock().unwrap().push(message);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

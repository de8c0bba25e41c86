// MIT License - Copyright (c) 2021 TJForc

//! Maps the panel's raw state onto the small vocabulary Home Assistant
//! understands. Everything here is pure.

use std::fmt;

use crate::state::{ArmingMode, PanelState};

/// Alarm sub-states that mean "an alarm is in progress".
pub const ACTIVE_ALARM_STATES: [&str; 9] = [
    "burglar-alarm",
    "entry-delay",
    "fire-alarm",
    "co-alarm",
    "panic",
    "user-verified-burglar-alarm",
    "user-verified-co-or-fire-alarm",
    "burglar-accelerated-alarm",
    "fire-accelerated-alarm",
];

/// Entry delay counts down before a real alarm; published as `pending`.
pub const ENTRY_DELAY: &str = "entry-delay";

pub const BURGLAR_ALARM_STATES: [&str; 3] = [
    "burglar-alarm",
    "user-verified-burglar-alarm",
    "burglar-accelerated-alarm",
];

pub const FIRE_ALARM_STATES: [&str; 4] = [
    "fire-alarm",
    "co-alarm",
    "user-verified-co-or-fire-alarm",
    "fire-accelerated-alarm",
];

/// Alarm panel state in Home Assistant's `alarm_control_panel` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishedAlarmMode {
    Disarmed,
    ArmedHome,
    ArmedAway,
    Pending,
    Triggered,
    Unknown,
}

impl PublishedAlarmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::ArmedHome => "armed_home",
            Self::ArmedAway => "armed_away",
            Self::Pending => "pending",
            Self::Triggered => "triggered",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PublishedAlarmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a switch state topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a panel snapshot. An active alarm always wins over the arming mode.
pub fn classify(state: &PanelState) -> PublishedAlarmMode {
    if let Some(alarm) = state.alarm_state()
        && ACTIVE_ALARM_STATES.contains(&alarm)
    {
        return if alarm == ENTRY_DELAY {
            PublishedAlarmMode::Pending
        } else {
            PublishedAlarmMode::Triggered
        };
    }

    match state.mode {
        ArmingMode::None => PublishedAlarmMode::Disarmed,
        ArmingMode::Some => PublishedAlarmMode::ArmedHome,
        ArmingMode::All => PublishedAlarmMode::ArmedAway,
        ArmingMode::Unknown(_) => PublishedAlarmMode::Unknown,
    }
}

pub fn siren_state(state: &PanelState) -> SwitchState {
    SwitchState::from_bool(state.siren.as_ref().is_some_and(|s| s.state == "on"))
}

pub fn police_panic_active(state: &PanelState) -> bool {
    state
        .alarm_state()
        .is_some_and(|alarm| BURGLAR_ALARM_STATES.contains(&alarm))
}

/// Fire is ON for the fire/CO family and also for the burglar family, so a
/// burglar alarm reports both panic switches active.
pub fn fire_panic_active(state: &PanelState) -> bool {
    state.alarm_state().is_some_and(|alarm| {
        BURGLAR_ALARM_STATES.contains(&alarm) || FIRE_ALARM_STATES.contains(&alarm)
    })
}

/// Panic switch states. Police and fire are separate predicates and may both be ON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicReport {
    pub police: SwitchState,
    pub fire: SwitchState,
}

/// Everything the bridge publishes for one observed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelReport {
    pub alarm: PublishedAlarmMode,
    pub siren: SwitchState,
    /// `None` when the panic switches are disabled.
    pub panic: Option<PanicReport>,
}

impl PanelReport {
    pub fn from_state(state: &PanelState, enable_panic: bool) -> Self {
        let panic = enable_panic.then(|| PanicReport {
            police: SwitchState::from_bool(police_panic_active(state)),
            fire: SwitchState::from_bool(fire_panic_active(state)),
        });
        Self {
            alarm: classify(state),
            siren: siren_state(state),
            panic,
        }
    }
}

// MIT License - Copyright (c) 2021 TJForc

use std::fmt;

use serde::{Deserialize, Deserializer};

/// Arming mode as reported by the cloud panel.
///
/// The cloud uses `none`, `some` and `all`; anything else is kept verbatim
/// so it can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArmingMode {
    /// Disarmed
    None,
    /// Partially armed (home)
    Some,
    /// Fully armed (away)
    All,
    /// Mode string the bridge does not understand
    Unknown(String),
}

impl ArmingMode {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "none" => Self::None,
            "some" => Self::Some,
            "all" => Self::All,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Some => "some",
            Self::All => "all",
            Self::Unknown(raw) => raw,
        }
    }
}

impl Default for ArmingMode {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl fmt::Display for ArmingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArmingMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlarmInfo {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SirenInfo {
    #[serde(default)]
    pub state: String,
}

/// Snapshot of the panel's reported fields.
///
/// Owned and mutated by the device collaborator; the bridge only ever reads
/// clones of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    #[serde(default)]
    pub mode: ArmingMode,
    #[serde(default)]
    pub alarm_info: Option<AlarmInfo>,
    #[serde(default)]
    pub siren: Option<SirenInfo>,
    #[serde(default)]
    pub battery_level: Option<u8>,
    #[serde(default)]
    pub tamper_status: Option<String>,
}

impl PanelState {
    pub fn with_mode(mode: ArmingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_alarm(mut self, state: impl Into<String>) -> Self {
        self.alarm_info = Some(AlarmInfo { state: state.into() });
        self
    }

    pub fn with_siren(mut self, state: impl Into<String>) -> Self {
        self.siren = Some(SirenInfo { state: state.into() });
        self
    }

    /// The transient alarm sub-state, if the panel reported one.
    pub fn alarm_state(&self) -> Option<&str> {
        self.alarm_info.as_ref().map(|info| info.state.as_str())
    }
}

// MIT License - Copyright (c) 2021 TJForc

//! Arm/disarm with confirmation by polling.
//!
//! The cloud never acknowledges a mode change, so the only way to know a
//! command took effect is to watch the cached panel state. Each attempt
//! re-issues the command, waits a moment for the cache to refresh, and
//! compares the observed mode against the target:
//!
//! ```text
//! attempt 1: call, settle, check
//! attempt 2: retry_delay, call, settle, check
//! ...
//! attempt N: retry_delay, call, settle, check -> Exhausted
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn, Instrument, Span};

use crate::config::RetryPolicy;
use crate::device::{spawn_detached, ControlCall, PanelDevice};
use crate::state::ArmingMode;

/// Arming command accepted on the alarm command topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmCommand {
    Disarm,
    ArmHome,
    ArmAway,
}

impl ArmCommand {
    /// Parse a command payload, ignoring case.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload.trim().to_lowercase().as_str() {
            "disarm" => Some(Self::Disarm),
            "arm_home" => Some(Self::ArmHome),
            "arm_away" => Some(Self::ArmAway),
            _ => None,
        }
    }

    /// Mode the panel reports once the command has been applied.
    pub fn target_mode(&self) -> ArmingMode {
        match self {
            Self::Disarm => ArmingMode::None,
            Self::ArmHome => ArmingMode::Some,
            Self::ArmAway => ArmingMode::All,
        }
    }

    pub fn control_call(&self) -> ControlCall {
        match self {
            Self::Disarm => ControlCall::Disarm,
            Self::ArmHome => ControlCall::ArmHome,
            Self::ArmAway => ControlCall::ArmAway,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarm => "disarm",
            Self::ArmHome => "arm_home",
            Self::ArmAway => "arm_away",
        }
    }
}

impl fmt::Display for ArmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reconciliation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The panel reached the target mode after `attempts` calls.
    Converged { attempts: u32 },
    /// The attempt budget ran out without the panel reaching the target.
    Exhausted { attempts: u32 },
    /// The payload was not an arming command; nothing was sent.
    Rejected,
}

/// Drives a panel into a requested arming mode.
///
/// Concurrent calls to [`Reconciler::reconcile`] are not serialized; two
/// conflicting commands in flight will both poll the same state.
#[derive(Clone)]
pub struct Reconciler {
    device: Arc<dyn PanelDevice>,
    policy: RetryPolicy,
    span: Span,
}

impl Reconciler {
    pub fn new(device: Arc<dyn PanelDevice>, policy: RetryPolicy, span: Span) -> Self {
        Self { device, policy, span }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue `requested` and poll until the panel reports the matching mode.
    pub async fn reconcile(&self, requested: &str) -> ReconcileOutcome {
        let span = self.span.clone();
        async move {
            debug!("Received set alarm mode {requested}");
            match ArmCommand::parse(requested) {
                Some(command) => self.drive(command).await,
                None => {
                    warn!("Cannot set alarm mode: unknown command {requested:?}");
                    ReconcileOutcome::Rejected
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, command: ArmCommand) -> ReconcileOutcome {
        let target = command.target_mode();

        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            debug!(attempt, "Set alarm mode: {command}");
            spawn_detached(Arc::clone(&self.device), command.control_call(), Span::current());

            // Only waits for the local cache to catch up, not for the cloud
            sleep(self.policy.settle_delay).await;

            let observed = self.device.state().mode;
            if observed == target {
                info!(attempt, "Alarm successfully entered {command} mode");
                return ReconcileOutcome::Converged { attempts: attempt };
            }
            debug!(attempt, "Alarm failed to enter {command} mode (observed {observed})");
        }

        warn!(
            "Alarm could not enter {command} mode after {} attempts, giving up",
            self.policy.max_attempts
        );
        ReconcileOutcome::Exhausted {
            attempts: self.policy.max_attempts,
        }
    }
}

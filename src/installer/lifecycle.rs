//! Per-capability lifecycle state machine.
use std::fmt;

use thiserror::Error;

/// Where a capability is in its provisioning lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Detection reported the tool missing or outdated.
    Absent,
    /// An install strategy is running.
    Installing,
    /// The tool is installed and verified.
    Present,
    /// Every strategy failed.
    Failed,
    /// Post-install configuration is being applied.
    Configuring,
    /// Configuration finished (possibly with warnings).
    Configured,
}

impl LifecycleState {
    const fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Absent, Self::Installing)
                | (Self::Installing, Self::Present | Self::Failed)
                | (Self::Present, Self::Configuring)
                | (Self::Configuring, Self::Configured)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Installing => "installing",
            Self::Present => "present",
            Self::Failed => "failed",
            Self::Configuring => "configuring",
            Self::Configured => "configured",
        })
    }
}

/// Rejected state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal lifecycle transition for '{capability}': {from} -> {to}")]
pub struct TransitionError {
    /// Capability name.
    pub capability: String,
    /// Current state.
    pub from: LifecycleState,
    /// Requested state.
    pub to: LifecycleState,
}

/// Tracks one capability through `Absent → Installing → {Present, Failed}`
/// and `Present → Configuring → Configured`.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    capability: String,
    state: LifecycleState,
}

impl Lifecycle {
    /// Start in `initial` (either [`Absent`](LifecycleState::Absent) or,
    /// for tools detected as installed, [`Present`](LifecycleState::Present)).
    #[must_use]
    pub fn new(capability: impl Into<String>, initial: LifecycleState) -> Self {
        Self {
            capability: capability.into(),
            state: initial,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] and leaves the state unchanged when the
    /// move is not allowed.
    pub fn advance(&mut self, next: LifecycleState) -> Result<(), TransitionError> {
        if !self.state.can_move_to(next) {
            return Err(TransitionError {
                capability: self.capability.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

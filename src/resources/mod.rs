//! Configuration steps as check-then-apply resources.
//!
//! A resource reads the host first and writes only when the host differs
//! from what the catalog asks for. Writes to an existing user file go
//! through [`helpers::fs::write_with_backup`], so the original is kept in
//! exactly one timestamped copy.
pub mod command;
pub mod copy;
pub mod file;
pub mod gsetting;
pub mod helpers;
pub mod json;
pub mod line;
pub mod preset;
pub mod shell;

use anyhow::Result;

/// What a resource found on the host.
///
/// # Examples
///
/// ```
/// use devsetup_cli::resources::ResourceState;
///
/// let shell = ResourceState::Incorrect { current: "/bin/bash".into() };
/// assert!(shell.differs());
/// assert!(!ResourceState::Invalid { reason: "settings.json has comments".into() }.differs());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing there yet (file, line, setting).
    Missing,
    /// Already as desired.
    Correct,
    /// Present with another value.
    Incorrect {
        /// What is there now, for the dry-run and change log.
        current: String,
    },
    /// Present but in a shape we refuse to touch.
    Invalid {
        /// Why it is left alone.
        reason: String,
    },
}

impl ResourceState {
    /// `true` when applying would change the host.
    #[must_use]
    pub const fn differs(&self) -> bool {
        matches!(self, Self::Missing | Self::Incorrect { .. })
    }
}

/// Outcome of [`Applicable::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The host was changed.
    Applied,
    /// Nothing to do.
    AlreadyCorrect,
    /// Could not be applied here (no sudo, schema missing).
    Skipped {
        /// Shown in the warning.
        reason: String,
    },
}

/// Something that can be written to the host.
pub trait Applicable {
    /// One-line label for logs, e.g. `~/.zshrc: eval "$(starship init zsh)"`.
    fn description(&self) -> String;

    /// Bring the host in line. Implementations re-check state first, so
    /// calling this on a correct resource is a no-op.
    ///
    /// # Errors
    ///
    /// I/O failures and failed external commands.
    fn apply(&self) -> Result<ResourceChange>;
}

/// An [`Applicable`] that can inspect the host without changing it.
pub trait Resource: Applicable {
    /// Read the current state. Must not write anything.
    ///
    /// # Errors
    ///
    /// When the host cannot be read (permissions, failed probe command).
    fn current_state(&self) -> Result<ResourceState>;
}

impl<T: Applicable + ?Sized> Applicable for Box<T> {
    fn description(&self) -> String {
        (**self).description()
    }

    fn apply(&self) -> Result<ResourceChange> {
        (**self).apply()
    }
}

impl<T: Resource + ?Sized> Resource for Box<T> {
    fn current_state(&self) -> Result<ResourceState> {
        (**self).current_state()
    }
}

//! Command run only while a check command fails.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Elevation, Executor};

/// Runs `command` when `unless` exits non-zero.
///
/// With an empty `unless` the command runs on every converge.
#[derive(Debug)]
pub struct CommandResource<'a> {
    command: Vec<String>,
    unless: Vec<String>,
    elevation: Elevation,
    executor: &'a dyn Executor,
}

impl<'a> CommandResource<'a> {
    /// Create the resource; `elevation` applies to `command` only.
    #[must_use]
    pub const fn new(
        command: Vec<String>,
        unless: Vec<String>,
        elevation: Elevation,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            command,
            unless,
            elevation,
            executor,
        }
    }
}

impl Applicable for CommandResource<'_> {
    fn description(&self) -> String {
        self.command.join(" ")
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let Some((program, rest)) = self.command.split_first() else {
            return Ok(ResourceChange::Skipped {
                reason: "empty command".to_string(),
            });
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let Some((program, args)) = self.elevation.wrap(program, &args) else {
            return Ok(ResourceChange::Skipped {
                reason: format!("{program} needs root and sudo is not available"),
            });
        };
        self.executor.run(program, &args)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CommandResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let Some((program, rest)) = self.unless.split_first() else {
            return Ok(ResourceState::Missing);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let check = self.executor.run_unchecked(program, &args)?;
        Ok(if check.success {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }
}

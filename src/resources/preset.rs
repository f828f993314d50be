//! Config file produced by a generator command, with a static fallback.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::helpers::fs::ensure_parent_dir;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Creates `path` by running `command` (`{path}` is substituted), writing
/// `fallback` when the command fails or produces nothing. An existing file
/// is never replaced.
#[derive(Debug)]
pub struct PresetResource<'a> {
    path: PathBuf,
    command: Vec<String>,
    fallback: String,
    executor: &'a dyn Executor,
}

impl<'a> PresetResource<'a> {
    /// Create the resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        command: Vec<String>,
        fallback: String,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            path,
            command,
            fallback,
            executor,
        }
    }

    fn generate(&self) -> bool {
        let target = self.path.to_string_lossy();
        let argv: Vec<String> = self
            .command
            .iter()
            .map(|a| a.replace("{path}", &target))
            .collect();
        let Some((program, rest)) = argv.split_first() else {
            return false;
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.executor
            .run_unchecked(program, &args)
            .is_ok_and(|r| r.success)
            && self.path.is_file()
    }
}

impl Applicable for PresetResource<'_> {
    fn description(&self) -> String {
        format!("{} from `{}`", self.path.display(), self.command.join(" "))
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        ensure_parent_dir(&self.path)?;
        if !self.generate() {
            std::fs::write(&self.path, &self.fallback)
                .with_context(|| format!("writing fallback {}", self.path.display()))?;
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PresetResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(if self.path.exists() {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        })
    }
}

//! Login shell selection and `/etc/shells` registration.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::helpers::fs::has_line;
use super::helpers::privileged;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Elevation, Executor};

/// Absolute path of `shell` as reported by `which`.
#[must_use]
pub fn resolve_shell_path(executor: &dyn Executor, shell: &str) -> Option<String> {
    executor
        .run_unchecked("which", &[shell])
        .ok()
        .filter(|r| r.success)
        .and_then(|r| r.stdout.lines().next().map(|l| l.trim().to_string()))
        .filter(|p| !p.is_empty())
}

/// Login shell recorded for the invoking user: `getent passwd` on Linux,
/// `dscl` on macOS. Unlike `$SHELL` this reflects a `chsh` made earlier in
/// the same session.
#[must_use]
pub fn login_shell(executor: &dyn Executor) -> Option<String> {
    let user = executor
        .run("id", &["-un"])
        .ok()
        .map(|r| r.stdout.trim().to_string())
        .filter(|u| !u.is_empty())?;

    let passwd = executor
        .run("getent", &["passwd", &user])
        .ok()
        .and_then(|r| {
            r.stdout
                .lines()
                .next()
                .and_then(|entry| entry.rsplit(':').next())
                .map(|shell| shell.trim().to_string())
        });
    passwd
        .or_else(|| {
            let record = format!("/Users/{user}");
            executor
                .run("dscl", &[".", "-read", &record, "UserShell"])
                .ok()
                .and_then(|r| {
                    r.stdout
                        .split_once(':')
                        .map(|(_, shell)| shell.trim().to_string())
                })
        })
        .filter(|shell| !shell.is_empty())
}

/// A resource for configuring the default login shell.
#[derive(Debug)]
pub struct DefaultShellResource<'a> {
    /// Target shell name (e.g., "zsh").
    target_shell: String,
    /// `$SHELL`, used when the user database cannot be read.
    current_shell: Option<String>,
    /// Executor for running system commands.
    executor: &'a dyn Executor,
}

impl<'a> DefaultShellResource<'a> {
    /// Create a new default shell resource.
    #[must_use]
    pub const fn new(
        target_shell: String,
        current_shell: Option<String>,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            target_shell,
            current_shell,
            executor,
        }
    }
}

impl Applicable for DefaultShellResource<'_> {
    fn description(&self) -> String {
        format!("default shell → {}", self.target_shell)
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let Some(shell_path) = resolve_shell_path(self.executor, &self.target_shell) else {
            return Ok(ResourceChange::Skipped {
                reason: format!("{} not found on PATH", self.target_shell),
            });
        };
        self.executor.run("chsh", &["-s", &shell_path])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DefaultShellResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let suffix = format!("/{}", self.target_shell);
        let current = login_shell(self.executor).or_else(|| self.current_shell.clone());
        Ok(match current.as_deref() {
            None | Some("") => ResourceState::Missing,
            Some(current) if current.ends_with(&suffix) => ResourceState::Correct,
            Some(current) => ResourceState::Incorrect {
                current: current.to_string(),
            },
        })
    }
}

/// Registers a shell path in `/etc/shells` so `chsh` accepts it.
#[derive(Debug)]
pub struct ShellRegistrationResource<'a> {
    shell_path: String,
    shells_file: PathBuf,
    elevation: Elevation,
    executor: &'a dyn Executor,
}

impl<'a> ShellRegistrationResource<'a> {
    /// Create the resource for `shells_file` (normally `/etc/shells`).
    #[must_use]
    pub const fn new(
        shell_path: String,
        shells_file: PathBuf,
        elevation: Elevation,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            shell_path,
            shells_file,
            elevation,
            executor,
        }
    }
}

impl Applicable for ShellRegistrationResource<'_> {
    fn description(&self) -> String {
        format!("{} in {}", self.shell_path, self.shells_file.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        privileged::append_line(
            self.executor,
            self.elevation,
            &self.shells_file,
            &self.shell_path,
        )
    }
}

impl Resource for ShellRegistrationResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let content = privileged::read_file(self.executor, self.elevation, &self.shells_file)
            .with_context(|| format!("reading {}", self.shells_file.display()))?;
        Ok(match content {
            None => ResourceState::Missing,
            Some(c) if has_line(&c, &self.shell_path) => ResourceState::Correct,
            Some(_) => ResourceState::Incorrect {
                current: "not registered".to_string(),
            },
        })
    }
}

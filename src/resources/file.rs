//! Managed file with exact content.
use std::path::PathBuf;

use anyhow::Result;

use super::helpers::privileged;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Elevation, Executor};

/// Ensures `path` contains exactly `content`.
///
/// Unprivileged files are written directly. Privileged files (systemd
/// drop-ins and the like) are written according to `elevation`.
#[derive(Debug)]
pub struct ManagedFileResource<'a> {
    path: PathBuf,
    content: String,
    elevation: Elevation,
    executor: &'a dyn Executor,
}

impl<'a> ManagedFileResource<'a> {
    /// A file owned by the user.
    #[must_use]
    pub const fn new(path: PathBuf, content: String, executor: &'a dyn Executor) -> Self {
        Self {
            path,
            content,
            elevation: Elevation::Direct,
            executor,
        }
    }

    /// A root-owned file written with `elevation`.
    #[must_use]
    pub const fn privileged(
        path: PathBuf,
        content: String,
        elevation: Elevation,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            path,
            content,
            elevation,
            executor,
        }
    }
}

impl Applicable for ManagedFileResource<'_> {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Correct {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        privileged::write_file(self.executor, self.elevation, &self.path, &self.content)
    }
}

impl Resource for ManagedFileResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(
            match privileged::read_file(self.executor, self.elevation, &self.path)? {
                None => ResourceState::Missing,
                Some(current) if current == self.content => ResourceState::Correct,
                Some(current) => ResourceState::Incorrect {
                    current: format!("{} bytes differ", current.len()),
                },
            },
        )
    }
}

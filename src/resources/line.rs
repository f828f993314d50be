//! Marker line in a text file (shell rc integration).
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::helpers::fs::{append_line_with_backup, has_line};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Ensures `line` appears in `path` exactly once.
#[derive(Debug, Clone)]
pub struct LineInFileResource {
    path: PathBuf,
    line: String,
    create: bool,
}

impl LineInFileResource {
    /// `create` controls whether a missing file is created or the step is
    /// skipped.
    #[must_use]
    pub const fn new(path: PathBuf, line: String, create: bool) -> Self {
        Self { path, line, create }
    }
}

impl Applicable for LineInFileResource {
    fn description(&self) -> String {
        format!("{} in {}", self.line, self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                append_line_with_backup(&self.path, &self.line)?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}

impl Resource for LineInFileResource {
    fn current_state(&self) -> Result<ResourceState> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if has_line(&content, &self.line) => Ok(ResourceState::Correct),
            Ok(_) => Ok(ResourceState::Incorrect {
                current: "line not present".to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.create {
                    Ok(ResourceState::Missing)
                } else {
                    Ok(ResourceState::Invalid {
                        reason: format!("{} does not exist", self.path.display()),
                    })
                }
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}

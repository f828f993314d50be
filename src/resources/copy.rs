//! File copied into place (e.g. a cluster kubeconfig into `~/.kube`).
use std::path::PathBuf;

use anyhow::Result;

use super::helpers::fs::write_with_backup;
use super::helpers::privileged;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Elevation, Executor};

/// Keeps `to` identical to `from`. With a privileged source the content is
/// read through `sudo cat`; the destination is always user-owned.
#[derive(Debug)]
pub struct CopyFileResource<'a> {
    from: PathBuf,
    to: PathBuf,
    elevation: Elevation,
    executor: &'a dyn Executor,
}

impl<'a> CopyFileResource<'a> {
    /// `elevation` applies to reading `from` only.
    #[must_use]
    pub const fn new(
        from: PathBuf,
        to: PathBuf,
        elevation: Elevation,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            from,
            to,
            elevation,
            executor,
        }
    }

    fn source(&self) -> Result<Option<String>> {
        privileged::read_file(self.executor, self.elevation, &self.from)
    }
}

impl Applicable for CopyFileResource<'_> {
    fn description(&self) -> String {
        format!("{} → {}", self.from.display(), self.to.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let Some(content) = self.source()? else {
            return Ok(ResourceChange::Skipped {
                reason: format!("{} does not exist", self.from.display()),
            });
        };
        if std::fs::read_to_string(&self.to).is_ok_and(|current| current == content) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        write_with_backup(&self.to, content.as_bytes())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CopyFileResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(source) = self.source()? else {
            return Ok(ResourceState::Invalid {
                reason: format!("{} does not exist", self.from.display()),
            });
        };
        Ok(match std::fs::read_to_string(&self.to) {
            Err(_) => ResourceState::Missing,
            Ok(current) if current == source => ResourceState::Correct,
            Ok(_) => ResourceState::Incorrect {
                current: "content differs".to_string(),
            },
        })
    }
}

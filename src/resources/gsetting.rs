//! One GNOME `gsettings` key.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Ensures `gsettings get <schema> <key>` reports `value`.
#[derive(Debug)]
pub struct GsettingResource<'a> {
    schema: String,
    key: String,
    value: String,
    executor: &'a dyn Executor,
}

impl<'a> GsettingResource<'a> {
    /// Create the resource. `value` uses GVariant text syntax, as printed by
    /// `gsettings get` (`'prefer-dark'`, `true`, `uint32 0`).
    #[must_use]
    pub const fn new(schema: String, key: String, value: String, executor: &'a dyn Executor) -> Self {
        Self {
            schema,
            key,
            value,
            executor,
        }
    }
}

/// Compare GVariant text loosely: `uint32 0` equals `0`, quotes may differ.
fn same_value(current: &str, desired: &str) -> bool {
    fn normalize(v: &str) -> String {
        let v = v.trim();
        let v = v
            .split_once(' ')
            .filter(|(ty, _)| {
                matches!(ty, &("uint32" | "int32" | "int64" | "uint64" | "double" | "byte"))
            })
            .map_or(v, |(_, rest)| rest);
        v.replace('"', "'")
    }
    normalize(current) == normalize(desired)
}

impl Applicable for GsettingResource<'_> {
    fn description(&self) -> String {
        format!("{} {} = {}", self.schema, self.key, self.value)
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                self.executor
                    .run("gsettings", &["set", &self.schema, &self.key, &self.value])?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}

impl Resource for GsettingResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("gsettings", &["get", &self.schema, &self.key])?;
        if !result.success {
            return Ok(ResourceState::Invalid {
                reason: format!("schema {} or key {} not available", self.schema, self.key),
            });
        }
        let current = result.stdout.trim();
        Ok(if same_value(current, &self.value) {
            ResourceState::Correct
        } else {
            ResourceState::Incorrect {
                current: current.to_string(),
            }
        })
    }
}

//! Top-level keys merged into a JSON settings file.
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde_json::{Map, Value};

use super::helpers::fs::write_with_backup;
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Ensures each key in `settings` has the given value, leaving every other
/// key untouched. Files that are not plain JSON objects (for example
/// settings with comments) are left alone.
#[derive(Debug, Clone)]
pub struct JsonSettingsResource {
    path: PathBuf,
    settings: Map<String, Value>,
}

enum Current {
    Missing,
    Object(Map<String, Value>),
    Unusable(String),
}

impl JsonSettingsResource {
    /// Create the resource.
    #[must_use]
    pub const fn new(path: PathBuf, settings: Map<String, Value>) -> Self {
        Self { path, settings }
    }

    fn read(&self) -> Result<Current> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Current::Missing),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };
        if text.trim().is_empty() {
            return Ok(Current::Object(Map::new()));
        }
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Current::Object(map),
            Ok(_) => Current::Unusable("top level is not an object".to_string()),
            Err(e) => Current::Unusable(format!("not plain JSON ({e})")),
        })
    }

    fn differing_keys(&self, current: &Map<String, Value>) -> Vec<&str> {
        self.settings
            .iter()
            .filter(|(k, v)| current.get(*k) != Some(*v))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl Applicable for JsonSettingsResource {
    fn description(&self) -> String {
        format!("{} ({} keys)", self.path.display(), self.settings.len())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut merged = match self.read()? {
            Current::Missing => Map::new(),
            Current::Object(map) => {
                if self.differing_keys(&map).is_empty() {
                    return Ok(ResourceChange::AlreadyCorrect);
                }
                map
            }
            Current::Unusable(reason) => {
                return Ok(ResourceChange::Skipped {
                    reason: format!("{}: {reason}", self.path.display()),
                });
            }
        };
        for (key, value) in &self.settings {
            merged.insert(key.clone(), value.clone());
        }
        let mut text = serde_json::to_string_pretty(&Value::Object(merged))
            .context("serializing settings")?;
        text.push('\n');
        write_with_backup(&self.path, text.as_bytes())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for JsonSettingsResource {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(match self.read()? {
            Current::Missing => ResourceState::Missing,
            Current::Unusable(reason) => ResourceState::Invalid { reason },
            Current::Object(map) => {
                let differing = self.differing_keys(&map);
                if differing.is_empty() {
                    ResourceState::Correct
                } else {
                    ResourceState::Incorrect {
                        current: differing.join(", "),
                    }
                }
            }
        })
    }
}

//! The capability catalog: what to install, how, and how to configure it.
pub mod capability;
pub mod desktop;
pub mod validation;

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::platform::Platform;

pub use capability::{
    ArchiveSpec, Capability, ConfigEntry, ConfigStep, DownloadSpec, Group, Packages, ScriptSpec,
    Strategy,
};
pub use desktop::{DesktopSetting, SettingGroup};

/// Catalog compiled into the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../../conf/capabilities.toml");

/// Loaded catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Capabilities in declaration (and execution) order.
    #[serde(default, rename = "capability")]
    pub capabilities: Vec<Capability>,
    /// Desktop settings.
    #[serde(default)]
    pub desktop: Vec<DesktopSetting>,
}

impl Catalog {
    /// The catalog shipped with the binary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the embedded catalog is malformed.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_CATALOG, "<builtin>")
    }

    /// Load a catalog from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid catalog.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Load `path` when given, the builtin catalog otherwise.
    ///
    /// # Errors
    ///
    /// See [`Catalog::load`] and [`Catalog::builtin`].
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(Self::builtin, Self::load)
    }

    /// Parse catalog TOML; `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] with the parser message.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.message().to_string(),
        })
    }

    /// Look up a capability by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    /// Capabilities that apply on `platform`, in declaration order.
    pub fn applicable<'a>(
        &'a self,
        platform: &'a Platform,
    ) -> impl Iterator<Item = &'a Capability> + 'a {
        self.capabilities
            .iter()
            .filter(move |c| c.applies_to(platform))
    }
}

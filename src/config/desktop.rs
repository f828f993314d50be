//! Declarative desktop settings (`gsettings` keys).
use serde::Deserialize;

/// Which install flag selects a desktop setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingGroup {
    /// Applied with `--install-desktop`.
    #[default]
    Desktop,
    /// Applied with `--ensure-taskbar`.
    Taskbar,
}

/// One `(schema, key, value)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesktopSetting {
    /// GSettings schema, e.g. `org.gnome.desktop.interface`.
    pub schema: String,
    /// Key within the schema.
    pub key: String,
    /// Value in GVariant text form, e.g. `'prefer-dark'`.
    pub value: String,
    /// Selecting group.
    #[serde(default)]
    pub group: SettingGroup,
}

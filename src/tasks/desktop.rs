//! GNOME desktop settings.
use anyhow::Result;

use super::{Context, Task, TaskResult, process_resources};
use crate::config::DesktopSetting;
use crate::resources::gsetting::GsettingResource;

/// Applies the catalog's `(schema, key, value)` list with `gsettings`.
#[derive(Debug)]
pub struct ApplyDesktopSettings {
    settings: Vec<DesktopSetting>,
}

impl ApplyDesktopSettings {
    /// Create the task for an already filtered list.
    #[must_use]
    pub const fn new(settings: Vec<DesktopSetting>) -> Self {
        Self { settings }
    }
}

impl Task for ApplyDesktopSettings {
    fn name(&self) -> &'static str {
        "desktop settings"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.is_linux()
            && ctx.platform.session.has_gui()
            && ctx.executor.which("gsettings")
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.platform.session.is_gnome() {
            ctx.log
                .debug("desktop is not GNOME; settings without a schema will be skipped");
        }
        let resources = self.settings.iter().map(|s| {
            GsettingResource::new(
                s.schema.clone(),
                s.key.clone(),
                s.value.clone(),
                ctx.executor.as_ref(),
            )
        });
        Ok(process_resources(ctx, resources, "set"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SettingGroup;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::platform::{Arch, Family, Platform, Session};
    use crate::tasks::test_helpers::make_context;
    use std::sync::Arc;

    fn setting(key: &str, value: &str) -> DesktopSetting {
        DesktopSetting {
            schema: "org.gnome.desktop.interface".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            group: SettingGroup::Desktop,
        }
    }

    fn gnome() -> Platform {
        let mut platform = Platform::new(Family::LinuxDebian, Arch::X86_64);
        platform.session = Session {
            x11: false,
            wayland: true,
            desktop: Some("ubuntu:gnome".to_string()),
        };
        platform
    }

    #[test]
    fn needs_session_and_gsettings() {
        let task = ApplyDesktopSettings::new(vec![]);
        let headless = make_context(
            Platform::new(Family::LinuxDebian, Arch::X86_64),
            Arc::new(ScriptedExecutor::new().with_path(&["gsettings"])),
        );
        assert!(!task.should_run(&headless));

        let no_tool = make_context(gnome(), Arc::new(ScriptedExecutor::new()));
        assert!(!task.should_run(&no_tool));

        let ready = make_context(
            gnome(),
            Arc::new(ScriptedExecutor::new().with_path(&["gsettings"])),
        );
        assert!(task.should_run(&ready));
    }

    #[test]
    fn applies_only_differing_keys_and_keeps_going() {
        let exec = Arc::new(
            ScriptedExecutor::new()
                .on(
                    "gsettings get org.gnome.desktop.interface color-scheme",
                    Reply::ok("'default'\n"),
                )
                .on(
                    "gsettings get org.gnome.desktop.interface clock-show-weekday",
                    Reply::ok("true\n"),
                )
                .on(
                    "gsettings get org.gnome.desktop.interface missing-key",
                    Reply::fail(1, "No such key"),
                )
                .on("gsettings set", Reply::ok("")),
        );
        let ctx = make_context(gnome(), Arc::clone(&exec));
        let task = ApplyDesktopSettings::new(vec![
            setting("missing-key", "1"),
            setting("color-scheme", "'prefer-dark'"),
            setting("clock-show-weekday", "true"),
        ]);

        assert!(matches!(task.run(&ctx).unwrap(), TaskResult::Ok));
        assert_eq!(
            exec.calls()
                .iter()
                .filter(|c| c.starts_with("gsettings set"))
                .collect::<Vec<_>>(),
            ["gsettings set org.gnome.desktop.interface color-scheme 'prefer-dark'"]
        );
    }
}

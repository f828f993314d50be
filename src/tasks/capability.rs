//! Provision one catalog capability: detect, install, verify, configure.
use std::path::PathBuf;

use anyhow::Result;

use super::{Context, Task, TaskResult, process_resources};
use crate::config::{Capability, ConfigStep, Group};
use crate::exec::Elevation;
use crate::installer::lifecycle::{Lifecycle, LifecycleState};
use crate::installer::version::Version;
use crate::installer::{Detection, InstallResult};
use crate::resources::Resource;
use crate::resources::command::CommandResource;
use crate::resources::copy::CopyFileResource;
use crate::resources::file::ManagedFileResource;
use crate::resources::helpers::fs::expand_home;
use crate::resources::json::JsonSettingsResource;
use crate::resources::line::LineInFileResource;
use crate::resources::preset::PresetResource;
use crate::resources::shell::{
    DefaultShellResource, ShellRegistrationResource, resolve_shell_path,
};

const SHELLS_FILE: &str = "/etc/shells";

/// Brings one capability to `Configured`.
#[derive(Debug)]
pub struct ProvisionCapability {
    capability: Capability,
}

impl ProvisionCapability {
    /// Create the task.
    #[must_use]
    pub const fn new(capability: Capability) -> Self {
        Self { capability }
    }

    fn preview(&self, ctx: &Context, detection: &Detection) -> Result<TaskResult> {
        let cap = &self.capability;
        match detection {
            Detection::Present(version) => {
                ctx.log.info(&present_message(version.as_ref()));
            }
            Detection::Outdated { .. } | Detection::Absent => {
                let chain = ctx.installer().plan(cap)?;
                ctx.log.dry_run(&format!(
                    "would install {} via {}",
                    cap.name,
                    chain.join(" → ")
                ));
            }
        }
        configure(ctx, cap);
        Ok(TaskResult::DryRun)
    }
}

fn present_message(version: Option<&Version>) -> String {
    version.map_or_else(
        || "already present".to_string(),
        |v| format!("already present ({v})"),
    )
}

impl Task for ProvisionCapability {
    fn name(&self) -> &str {
        &self.capability.name
    }

    fn required(&self) -> bool {
        self.capability.required
    }

    fn should_run(&self, ctx: &Context) -> bool {
        self.capability.applies_to(&ctx.platform)
            && (self.capability.group != Group::Desktop
                || !ctx.platform.is_linux()
                || ctx.platform.session.has_gui())
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let cap = &self.capability;
        let installer = ctx.installer();
        let detection = installer.detect(cap);
        if ctx.dry_run {
            return self.preview(ctx, &detection);
        }

        let mut lifecycle = Lifecycle::new(
            &cap.name,
            if detection.is_present() {
                LifecycleState::Present
            } else {
                LifecycleState::Absent
            },
        );

        match detection {
            Detection::Present(version) => ctx.log.info(&present_message(version.as_ref())),
            Detection::Outdated { found, minimum } => {
                ctx.log
                    .info(&format!("{found} is older than {minimum}, upgrading"));
            }
            Detection::Absent => {}
        }

        if lifecycle.state() == LifecycleState::Absent {
            lifecycle.advance(LifecycleState::Installing)?;
            let outcome = installer.install(cap);
            for attempt in &outcome.attempts {
                if let Some(err) = &attempt.error {
                    ctx.log.debug(&format!("{}: {err}", attempt.strategy));
                }
            }
            if let InstallResult::Failed(err) = &outcome.result {
                lifecycle.advance(LifecycleState::Failed)?;
                return Err(err.clone().into());
            }
            lifecycle.advance(LifecycleState::Present)?;
            let via = outcome
                .attempts
                .last()
                .map_or_else(String::new, |a| format!(" via {}", a.strategy));
            let version = outcome
                .version
                .map_or_else(String::new, |v| format!(" ({v})"));
            if outcome.result == InstallResult::InstalledWithFallback {
                ctx.log
                    .warn(&format!("{} installed with fallback{via}{version}", cap.name));
            } else {
                ctx.log.info(&format!("installed{via}{version}"));
            }
        }

        lifecycle.advance(LifecycleState::Configuring)?;
        let result = configure(ctx, cap);
        lifecycle.advance(LifecycleState::Configured)?;
        Ok(result)
    }
}

/// Apply the capability's configuration steps, best effort.
fn configure(ctx: &Context, cap: &Capability) -> TaskResult {
    let resources: Vec<Box<dyn Resource + '_>> = cap
        .configure
        .iter()
        .filter(|entry| entry.applies_to(&ctx.platform))
        .flat_map(|entry| resources_for(ctx, &entry.step))
        .collect();
    if resources.is_empty() {
        return if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        };
    }
    process_resources(ctx, resources, "configure")
}

fn path_in(ctx: &Context, raw: &str) -> PathBuf {
    expand_home(raw, &ctx.home)
}

/// Resources implementing one configuration step.
fn resources_for<'a>(ctx: &'a Context, step: &ConfigStep) -> Vec<Box<dyn Resource + 'a>> {
    let executor = ctx.executor.as_ref();
    match step {
        ConfigStep::Line { path, line, create } => vec![Box::new(LineInFileResource::new(
            path_in(ctx, path),
            line.clone(),
            *create,
        ))],
        ConfigStep::File {
            path,
            content,
            privileged,
        } => {
            let path = path_in(ctx, path);
            let resource = if *privileged {
                ManagedFileResource::privileged(path, content.clone(), ctx.elevation(), executor)
            } else {
                ManagedFileResource::new(path, content.clone(), executor)
            };
            vec![Box::new(resource)]
        }
        ConfigStep::Json { path, settings } => vec![Box::new(JsonSettingsResource::new(
            path_in(ctx, path),
            settings.clone(),
        ))],
        ConfigStep::Preset {
            command,
            path,
            fallback,
        } => vec![Box::new(PresetResource::new(
            path_in(ctx, path),
            command.clone(),
            fallback.clone(),
            executor,
        ))],
        ConfigStep::DefaultShell { shell } => default_shell(ctx, shell),
        ConfigStep::Copy {
            from,
            to,
            privileged,
        } => {
            let elevation = if *privileged {
                ctx.elevation()
            } else {
                Elevation::Direct
            };
            vec![Box::new(CopyFileResource::new(
                path_in(ctx, from),
                path_in(ctx, to),
                elevation,
                executor,
            ))]
        }
        ConfigStep::Command {
            command,
            unless,
            privileged,
        } => {
            let elevation = if *privileged {
                ctx.elevation()
            } else {
                Elevation::Direct
            };
            vec![Box::new(CommandResource::new(
                command.clone(),
                unless.clone(),
                elevation,
                executor,
            ))]
        }
    }
}

/// Register the shell in `/etc/shells`, then make it the login shell.
fn default_shell<'a>(ctx: &'a Context, shell: &str) -> Vec<Box<dyn Resource + 'a>> {
    if ctx.platform.is_windows() {
        return vec![];
    }
    if ctx.ci {
        ctx.log
            .debug(&format!("CI detected, leaving the login shell alone ({shell})"));
        return vec![];
    }
    let executor = ctx.executor.as_ref();
    let mut resources: Vec<Box<dyn Resource + 'a>> = Vec::new();
    if let Some(path) = resolve_shell_path(executor, shell) {
        resources.push(Box::new(ShellRegistrationResource::new(
            path,
            PathBuf::from(SHELLS_FILE),
            ctx.elevation(),
            executor,
        )));
    }
    resources.push(Box::new(DefaultShellResource::new(
        shell.to_string(),
        ctx.current_shell.clone(),
        executor,
    )));
    resources
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::Catalog;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::installer::InstallSession;
    use crate::logging::{Logger, TaskStatus};
    use crate::platform::{Arch, Family, Platform};
    use crate::tasks::execute;
    use crate::tasks::test_helpers::make_context;
    use std::sync::Arc;

    const STARSHIP: &str = r#"
[[capability]]
name = "starship"
group = "shell"
detect = ["starship", "--version"]

[capability.install]
linux-debian = [{ apt = "starship" }]

[[capability.configure]]
kind = "preset"
command = ["starship", "preset", "nerd-font-symbols", "-o", "{path}"]
path = "~/.config/starship.toml"
fallback = "add_newline = true\n\n[character]\nsuccess_symbol = \"[>](bold green)\"\n"

[[capability.configure]]
kind = "line"
path = "~/.zshrc"
line = 'eval "$(starship init zsh)"'
"#;

    const ZSH: &str = r#"
[[capability]]
name = "zsh"
group = "shell"
detect = ["zsh", "--version"]

[[capability.configure]]
kind = "default_shell"
shell = "zsh"
"#;

    const CURL: &str = r#"
[[capability]]
name = "curl"
required = true
detect = ["curl", "--version"]

[capability.install]
linux-debian = [{ apt = "curl" }]
"#;

    struct Fixture {
        ctx: Context,
        exec: Arc<ScriptedExecutor>,
        log: Arc<Logger>,
        home: tempfile::TempDir,
    }

    fn fixture(family: Family, exec: ScriptedExecutor) -> Fixture {
        let exec = Arc::new(exec);
        let home = tempfile::tempdir().unwrap();
        let log = Arc::new(Logger::new("test"));
        let mut ctx = make_context(Platform::new(family, Arch::X86_64), Arc::clone(&exec));
        ctx.log = Arc::clone(&log) as Arc<dyn crate::logging::Log>;
        ctx.home = home.path().to_path_buf();
        ctx.session = Arc::new(InstallSession::new().with_elevation(Elevation::Direct));
        Fixture {
            ctx,
            exec,
            log,
            home,
        }
    }

    fn task(toml: &str, name: &str) -> ProvisionCapability {
        let catalog = Catalog::parse(toml, "test").unwrap();
        ProvisionCapability::new(catalog.get(name).unwrap().clone())
    }

    #[test]
    fn present_starship_with_failing_preset_writes_fallback() {
        let f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new()
                .on("starship --version", Reply::ok("starship 1.17.1"))
                .on("starship preset", Reply::fail(1, "unknown preset")),
        );
        let t = task(STARSHIP, "starship");

        let result = t.run(&f.ctx).unwrap();

        assert!(matches!(result, TaskResult::Ok));
        let config =
            std::fs::read_to_string(f.home.path().join(".config/starship.toml")).unwrap();
        assert!(config.contains("add_newline"));
        assert!(config.contains("[character]"));
        let zshrc = std::fs::read_to_string(f.home.path().join(".zshrc")).unwrap();
        assert_eq!(zshrc, "eval \"$(starship init zsh)\"\n");
        assert_eq!(f.exec.count("apt-get"), 0);
    }

    #[test]
    fn second_run_changes_nothing() {
        let f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new()
                .on("starship --version", Reply::ok("starship 1.17.1"))
                .on("starship preset", Reply::fail(1, "")),
        );
        let t = task(STARSHIP, "starship");
        t.run(&f.ctx).unwrap();
        let zshrc = f.home.path().join(".zshrc");
        let first = std::fs::read(&zshrc).unwrap();
        let calls_before = f.exec.calls().len();

        t.run(&f.ctx).unwrap();

        assert_eq!(std::fs::read(&zshrc).unwrap(), first);
        assert_eq!(f.exec.calls().len(), calls_before + 1);
        assert_eq!(f.exec.count("starship preset"), 1);
    }

    #[test]
    fn missing_tool_is_installed_then_configured() {
        let f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new()
                .on("starship --version", Reply::fail(127, "not found"))
                .on("starship --version", Reply::ok("starship 1.17.1"))
                .on("apt-get update", Reply::ok(""))
                .on("apt-get install -y starship", Reply::ok(""))
                .on("starship preset", Reply::ok("")),
        );
        let t = task(STARSHIP, "starship");

        assert!(matches!(t.run(&f.ctx).unwrap(), TaskResult::Ok));
        assert_eq!(f.exec.count("apt-get install"), 1);
        assert!(f.home.path().join(".config/starship.toml").exists());
    }

    #[test]
    fn dry_run_plans_without_mutating() {
        let mut f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new().on("starship --version", Reply::fail(127, "")),
        );
        f.ctx.dry_run = true;
        let t = task(STARSHIP, "starship");

        assert!(matches!(t.run(&f.ctx).unwrap(), TaskResult::DryRun));
        assert_eq!(f.exec.calls(), ["starship --version"]);
        assert!(!f.home.path().join(".zshrc").exists());
    }

    #[test]
    fn required_capability_on_arch_fails_naming_platform() {
        let f = fixture(
            Family::Unsupported("arch".to_string()),
            ScriptedExecutor::new().on("curl --version", Reply::fail(127, "")),
        );
        let t = task(CURL, "curl");
        assert!(t.required());
        assert!(t.should_run(&f.ctx));

        let err = execute(&t, &f.ctx).unwrap_err();

        assert!(format!("{err:#}").contains("arch"));
        assert_eq!(f.log.count(TaskStatus::Failed), 1);
    }

    #[test]
    fn default_shell_registers_then_changes_login_shell() {
        let mut f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new()
                .on("zsh --version", Reply::ok("zsh 5.9"))
                .on("which zsh", Reply::ok("/usr/bin/zsh\n"))
                .on("chsh -s /usr/bin/zsh", Reply::ok("")),
        );
        f.ctx.current_shell = Some("/bin/bash".to_string());
        let resources = resources_for(
            &f.ctx,
            &ConfigStep::DefaultShell {
                shell: "zsh".to_string(),
            },
        );
        assert_eq!(resources.len(), 2);
        assert!(resources[0].description().contains(SHELLS_FILE));
        let chsh = resources.last().unwrap();
        assert_eq!(
            chsh.current_state().unwrap(),
            crate::resources::ResourceState::Incorrect {
                current: "/bin/bash".to_string()
            }
        );
        chsh.apply().unwrap();
        assert_eq!(f.exec.count("chsh"), 1);
    }

    #[test]
    fn default_shell_is_left_alone_in_ci() {
        let mut f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new().on("zsh --version", Reply::ok("zsh 5.9")),
        );
        f.ctx.ci = true;
        let t = task(ZSH, "zsh");

        assert!(matches!(t.run(&f.ctx).unwrap(), TaskResult::Ok));
        assert_eq!(f.exec.count("chsh"), 0);
        assert_eq!(f.exec.count("which"), 0);
    }

    #[test]
    fn desktop_capability_needs_graphical_session_on_linux() {
        let toml = r#"
[[capability]]
name = "vscode"
group = "desktop"
detect = ["code", "--version"]
"#;
        let f = fixture(Family::LinuxDebian, ScriptedExecutor::new());
        assert!(!task(toml, "vscode").should_run(&f.ctx));

        let mac = fixture(Family::Macos, ScriptedExecutor::new());
        assert!(task(toml, "vscode").should_run(&mac.ctx));
    }

    const K3S: &str = r#"
[[capability]]
name = "k3s"
detect = ["k3s", "--version"]

[[capability.configure]]
kind = "file"
path = "~/k3s.service.d/10-kubeconfig-mode.conf"
content = "[Service]\nEnvironment=\"K3S_KUBECONFIG_MODE=644\"\n"

[[capability.configure]]
kind = "command"
command = ["systemctl", "restart", "k3s"]
unless = ["systemctl", "show", "k3s", "-p", "Environment"]
privileged = true
"#;

    #[test]
    fn drop_in_change_restarts_service_once() {
        let f = fixture(
            Family::LinuxDebian,
            ScriptedExecutor::new()
                .on("k3s --version", Reply::ok("k3s version v1.30.2+k3s1"))
                .on("systemctl show k3s", Reply::fail(1, ""))
                .on("systemctl show k3s", Reply::fail(1, ""))
                .on("systemctl show k3s", Reply::ok(""))
                .on("systemctl restart k3s", Reply::ok("")),
        );
        let t = task(K3S, "k3s");

        t.run(&f.ctx).unwrap();
        t.run(&f.ctx).unwrap();

        assert!(f.home.path().join("k3s.service.d/10-kubeconfig-mode.conf").exists());
        assert_eq!(f.exec.count("systemctl restart k3s"), 1);
    }
}

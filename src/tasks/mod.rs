//! Named tasks that orchestrate installs and resource changes.
pub mod ansible;
pub mod capability;
pub mod desktop;
mod processing;

pub use processing::Context;
pub use processing::context::home_dir;
pub use processing::{TaskResult, TaskStats, process_resources};

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{Capability, Catalog, Group, SettingGroup};
use crate::logging::TaskStatus;

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether a failure of this task must stop the run.
    fn required(&self) -> bool {
        false
    }

    /// Whether this task should run on the current platform.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails to execute, such as when every
    /// install strategy fails or a system command cannot be run.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Which parts of the catalog an install run covers.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Leave the shell group (zsh, starship) out.
    pub skip_zsh: bool,
    /// Leave the fonts group out.
    pub skip_fonts: bool,
    /// Include desktop applications and settings.
    pub install_desktop: bool,
    /// Include the developer tools group.
    pub install_dev_tools: bool,
    /// Apply taskbar settings.
    pub ensure_taskbar: bool,
    /// Playbook to run at the end; `None` skips Ansible entirely.
    pub ansible_playbook: Option<PathBuf>,
    /// When non-empty, only these capabilities run.
    pub only: Vec<String>,
    /// Capabilities never run.
    pub skip: Vec<String>,
}

impl Selection {
    /// Whether capabilities of `group` are part of this run.
    #[must_use]
    pub const fn includes_group(&self, group: Group) -> bool {
        match group {
            Group::Core => true,
            Group::Shell => !self.skip_zsh,
            Group::Fonts => !self.skip_fonts,
            Group::Desktop => self.install_desktop,
            Group::DevTools => self.install_dev_tools,
            Group::Ansible => self.ansible_playbook.is_some(),
        }
    }

    /// Whether `cap` is part of this run. Names given with `only`/`skip`
    /// override group selection.
    #[must_use]
    pub fn includes(&self, cap: &Capability) -> bool {
        if self.skip.iter().any(|s| *s == cap.name) {
            return false;
        }
        if !self.only.is_empty() {
            return self.only.iter().any(|o| *o == cap.name);
        }
        self.includes_group(cap.group)
    }

    const fn includes_setting_group(&self, group: SettingGroup) -> bool {
        match group {
            SettingGroup::Desktop => self.install_desktop,
            SettingGroup::Taskbar => self.ensure_taskbar,
        }
    }
}

/// The task list run by the install command, in execution order.
#[must_use]
pub fn install_tasks(catalog: &Catalog, selection: &Selection) -> Vec<Box<dyn Task>> {
    let mut tasks: Vec<Box<dyn Task>> = catalog
        .capabilities
        .iter()
        .filter(|cap| selection.includes(cap))
        .map(|cap| Box::new(capability::ProvisionCapability::new(cap.clone())) as Box<dyn Task>)
        .collect();

    let settings: Vec<_> = catalog
        .desktop
        .iter()
        .filter(|s| selection.includes_setting_group(s.group))
        .cloned()
        .collect();
    if selection.only.is_empty() && !settings.is_empty() {
        tasks.push(Box::new(desktop::ApplyDesktopSettings::new(settings)));
    }

    if selection.only.is_empty()
        && let Some(playbook) = &selection.ansible_playbook
    {
        tasks.push(Box::new(ansible::RunAnsiblePlaybook::new(playbook.clone())));
    }
    tasks
}

/// Execute a task, recording the result in the logger.
///
/// # Errors
///
/// Returns the task's error when a [`required`](Task::required) task fails.
/// Failures of optional tasks are recorded and logged as warnings only.
pub fn execute(task: &dyn Task, ctx: &Context) -> Result<()> {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return Ok(());
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            if task.required() {
                ctx.log.error(&format!("{}: {e:#}", task.name()));
                return Err(e);
            }
            ctx.log.warn(&format!("{}: {e:#}", task.name()));
        }
    }
    Ok(())
}

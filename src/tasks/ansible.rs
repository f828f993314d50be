//! Hand the rest of the setup to an Ansible playbook.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};

/// Runs `ansible-playbook <playbook>`.
#[derive(Debug)]
pub struct RunAnsiblePlaybook {
    playbook: PathBuf,
}

impl RunAnsiblePlaybook {
    /// Create the task.
    #[must_use]
    pub const fn new(playbook: PathBuf) -> Self {
        Self { playbook }
    }
}

impl Task for RunAnsiblePlaybook {
    fn name(&self) -> &'static str {
        "ansible playbook"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.platform.is_windows()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !self.playbook.is_file() {
            return Ok(TaskResult::Skipped(format!(
                "{} not found",
                self.playbook.display()
            )));
        }
        if !ctx.executor.which("ansible-playbook") {
            return Ok(TaskResult::Skipped(
                "ansible-playbook not on PATH".to_string(),
            ));
        }
        let playbook = self.playbook.to_string_lossy().into_owned();
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would run ansible-playbook {playbook}"));
            return Ok(TaskResult::DryRun);
        }
        let result = ctx
            .executor
            .run("ansible-playbook", &[playbook.as_str()])
            .with_context(|| format!("running playbook {playbook}"))?;
        for line in result.stdout.lines().filter(|l| !l.trim().is_empty()) {
            ctx.log.debug(line);
        }
        ctx.log.info(&format!("applied {playbook}"));
        Ok(TaskResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::platform::{Arch, Family, Platform};
    use crate::tasks::test_helpers::make_context;
    use std::sync::Arc;

    fn playbook() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playbook.yml");
        std::fs::write(&path, "- hosts: localhost\n  tasks: []\n").unwrap();
        (dir, path)
    }

    #[test]
    fn missing_playbook_is_skipped() {
        let ctx = make_context(
            Platform::new(Family::LinuxDebian, Arch::X86_64),
            Arc::new(ScriptedExecutor::new().with_path(&["ansible-playbook"])),
        );
        let task = RunAnsiblePlaybook::new(PathBuf::from("/nonexistent/playbook.yml"));
        assert!(matches!(task.run(&ctx).unwrap(), TaskResult::Skipped(_)));
    }

    #[test]
    fn runs_playbook_when_available() {
        let (_dir, path) = playbook();
        let exec = Arc::new(
            ScriptedExecutor::new()
                .with_path(&["ansible-playbook"])
                .on("ansible-playbook", Reply::ok("PLAY RECAP\nlocalhost: ok=1\n")),
        );
        let ctx = make_context(
            Platform::new(Family::LinuxRhel, Arch::X86_64),
            Arc::clone(&exec),
        );

        let task = RunAnsiblePlaybook::new(path);
        assert!(matches!(task.run(&ctx).unwrap(), TaskResult::Ok));
        assert_eq!(exec.count("ansible-playbook"), 1);
    }

    #[test]
    fn failing_playbook_is_an_error() {
        let (_dir, path) = playbook();
        let exec = Arc::new(
            ScriptedExecutor::new()
                .with_path(&["ansible-playbook"])
                .on("ansible-playbook", Reply::fail(2, "fatal: [localhost]")),
        );
        let ctx = make_context(Platform::new(Family::Macos, Arch::Aarch64), exec);

        let task = RunAnsiblePlaybook::new(path);
        assert!(!task.required());
        assert!(task.run(&ctx).is_err());
    }

    #[test]
    fn not_run_on_windows() {
        let ctx = make_context(
            Platform::new(Family::Windows, Arch::X86_64),
            Arc::new(ScriptedExecutor::new()),
        );
        assert!(!RunAnsiblePlaybook::new(PathBuf::from("playbook.yml")).should_run(&ctx));
    }
}

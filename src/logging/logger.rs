//! Console/file logger with summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Logger that emits `tracing` events and collects task results for the
/// end-of-run summary.
///
/// Output formatting and the persistent log file are handled by the
/// subscriber installed with [`init_subscriber`](super::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`. Does not touch the log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Path of the persistent log file, if the cache directory is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Snapshot of recorded task entries, in execution order.
    #[must_use]
    pub fn entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    /// Number of tasks recorded with `status`.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks
            .lock()
            .map_or(0, |g| g.iter().filter(|t| t.status == status).count())
    }

    /// Print one line per recorded task followed by the totals.
    pub fn print_summary(&self) {
        let tasks = self.entries();
        if tasks.is_empty() {
            return;
        }

        println!();
        Log::stage(self, "Summary");

        for task in &tasks {
            let (icon, color) = task.status.icon();
            let suffix = task
                .message
                .as_ref()
                .map_or_else(String::new, |m| format!(" ({m})"));
            Log::info(self, &format!("{color}{icon} {}{suffix}\x1b[0m", task.name));
        }

        println!();
        Log::info(
            self,
            &format!(
                "{} tasks: \x1b[32m{} ok\x1b[0m, \x1b[2m{} n/a\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[37m{} dry-run\x1b[0m, \x1b[31m{} failed\x1b[0m",
                tasks.len(),
                self.count(TaskStatus::Ok),
                self.count(TaskStatus::NotApplicable),
                self.count(TaskStatus::Skipped),
                self.count(TaskStatus::DryRun),
                self.count(TaskStatus::Failed),
            ),
        );

        if let Some(path) = &self.log_file {
            Log::info(self, &format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn records_tasks_in_order() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("git", TaskStatus::Ok, Some("installed"));
        log.record_task("k9s", TaskStatus::Skipped, Some("not on PATH"));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "git");
        assert_eq!(entries[1].message.as_deref(), Some("not on PATH"));
    }

    #[test]
    fn failure_count_counts_only_failed() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("a", TaskStatus::Ok, None);
        log.record_task("b", TaskStatus::Failed, Some("exit 100"));
        log.record_task("c", TaskStatus::Failed, None);
        log.record_task("d", TaskStatus::DryRun, None);
        assert_eq!(log.failure_count(), 2);
        assert_eq!(log.count(TaskStatus::DryRun), 1);
    }

    #[test]
    fn file_layer_writes_tagged_lines() {
        let (log, _tmp, _guard) = isolated_logger();
        let pid = std::process::id();
        log.stage(&format!("stage-{pid}"));
        log.warn(&format!("warn-{pid}"));
        log.dry_run(&format!("plan-{pid}"));
        log.debug(&format!("debug-{pid}"));

        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains(&format!("==> stage-{pid}")));
        assert!(contents.contains(&format!("[warn] warn-{pid}")));
        assert!(contents.contains(&format!("[dry run] plan-{pid}")));
        assert!(
            contents.contains(&format!("[debug] debug-{pid}")),
            "debug always reaches the file"
        );
    }

    #[test]
    fn colours_are_stripped_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.info("\x1b[32mgreen\x1b[0m text");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("green text"));
        assert!(!contents.contains("\x1b["));
    }

    #[test]
    fn summary_lists_each_task() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("starship", TaskStatus::Ok, Some("installed with fallback"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("starship (installed with fallback)"));
        assert!(contents.contains("1 tasks:"));
    }
}

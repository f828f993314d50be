//! Core logging types: summary entries, task status, and the [`Log`] trait.

/// One line of the end-of-run summary.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Task name (usually the capability name).
    pub name: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Optional detail (skip reason, install result, error).
    pub message: Option<String>,
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully.
    Ok,
    /// Task does not apply to this platform or flag selection.
    NotApplicable,
    /// Task was skipped at run time (missing tool, best-effort failure).
    Skipped,
    /// Task ran in dry-run mode; nothing was changed.
    DryRun,
    /// Task failed.
    Failed,
}

impl TaskStatus {
    /// Summary icon and ANSI colour for this status.
    #[must_use]
    pub const fn icon(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::NotApplicable => ("·", "\x1b[2m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Logging backend used by tasks, resources and the installer.
pub trait Log: Send + Sync {
    /// Log a stage header.
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (console only with `--verbose`).
    fn debug(&self, msg: &str);
    /// Log a warning.
    fn warn(&self, msg: &str);
    /// Log an error.
    fn error(&self, msg: &str);
    /// Log an action that would have been taken without `--dry-run`.
    fn dry_run(&self, msg: &str);
    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}

//! Converge a list of resources: check each one, apply what differs, count
//! the outcome.

mod apply;
pub mod context;

pub use context::Context;

use crate::resources::Resource;

/// Result of a single task execution.
///
/// # Examples
///
/// ```
/// use devsetup_cli::tasks::TaskResult;
///
/// let skipped = TaskResult::Skipped("no graphical session".into());
/// assert!(matches!(skipped, TaskResult::Skipped(_)));
/// ```
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task was skipped (tool missing, nothing to do on this host).
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun,
}

/// Per-resource tallies for one task.
///
/// # Examples
///
/// ```
/// use devsetup_cli::tasks::TaskStats;
///
/// let stats = TaskStats { changed: 2, already_ok: 5, ..TaskStats::default() };
/// assert_eq!(stats.summary(false), "2 changed, 5 already ok");
///
/// let stats = TaskStats { changed: 1, skipped: 1, failed: 2, ..TaskStats::default() };
/// assert_eq!(stats.summary(true), "1 would change, 0 already ok, 1 skipped, 2 failed");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Resources changed (or that would change in a dry run).
    pub changed: u32,
    /// Resources already in the desired state.
    pub already_ok: u32,
    /// Resources that do not apply here (e.g. the target file is absent).
    pub skipped: u32,
    /// Resources that could not be checked or applied.
    pub failed: u32,
}

impl TaskStats {
    fn one(bump: impl FnOnce(&mut Self)) -> Self {
        let mut stats = Self::default();
        bump(&mut stats);
        stats
    }

    /// Human-readable tallies; skipped and failed only when non-zero.
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut out = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            out.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            out.push_str(&format!(", {} failed", self.failed));
        }
        out
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Converge `resources` in order and log the tallies. `verb` names the
/// change in log lines ("configure", "set").
///
/// A resource that cannot be checked or applied is logged as a warning and
/// counted; the rest of the list still runs.
pub fn process_resources<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    verb: &str,
) -> TaskResult {
    let mut stats = TaskStats::default();
    for resource in resources {
        stats += apply::converge(ctx, &resource, verb);
    }

    let summary = stats.summary(ctx.dry_run);
    if stats.failed > 0 {
        ctx.log.warn(&summary);
    } else {
        ctx.log.info(&summary);
    }
    if ctx.dry_run {
        TaskResult::DryRun
    } else {
        TaskResult::Ok
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use crate::resources::{Applicable, ResourceChange, ResourceState};
    use crate::tasks::test_helpers::make_static_context;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resource with a scripted state and apply result.
    struct Scripted {
        state: Result<ResourceState, &'static str>,
        outcome: Result<ResourceChange, &'static str>,
        applies: AtomicUsize,
    }

    fn scripted(state: ResourceState) -> Scripted {
        Scripted {
            state: Ok(state),
            outcome: Ok(ResourceChange::Applied),
            applies: AtomicUsize::new(0),
        }
    }

    impl Scripted {
        fn applying(mut self, outcome: Result<ResourceChange, &'static str>) -> Self {
            self.outcome = outcome;
            self
        }

        fn unreadable(mut self, why: &'static str) -> Self {
            self.state = Err(why);
            self
        }

        fn applies(&self) -> usize {
            self.applies.load(Ordering::SeqCst)
        }
    }

    impl Applicable for Scripted {
        fn description(&self) -> String {
            "~/.zshrc line".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone().map_err(anyhow::Error::msg)
        }
    }

    impl Resource for Scripted {
        fn current_state(&self) -> Result<ResourceState> {
            self.state.clone().map_err(anyhow::Error::msg)
        }
    }

    fn stale() -> ResourceState {
        ResourceState::Incorrect {
            current: "line not present".to_string(),
        }
    }

    #[test]
    fn summary_lists_only_non_zero_extras() {
        let stats = TaskStats {
            changed: 3,
            ..TaskStats::default()
        };
        assert_eq!(stats.summary(false), "3 changed, 0 already ok");
        let stats = TaskStats {
            skipped: 1,
            ..TaskStats::default()
        };
        assert_eq!(stats.summary(false), "0 changed, 0 already ok, 1 skipped");
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = TaskStats::one(|s| s.changed += 1);
        stats += TaskStats::one(|s| s.failed += 1);
        stats += TaskStats::one(|s| s.failed += 1);
        assert_eq!(
            stats,
            TaskStats {
                changed: 1,
                failed: 2,
                ..TaskStats::default()
            }
        );
    }

    #[test]
    fn correct_resource_is_not_applied() {
        let (ctx, _log) = make_static_context();
        let r = scripted(ResourceState::Correct);
        let stats = apply::converge(&ctx, &r, "configure");
        assert_eq!(stats.already_ok, 1);
        assert_eq!(r.applies(), 0);
    }

    #[test]
    fn invalid_resource_is_skipped() {
        let (ctx, _log) = make_static_context();
        let r = scripted(ResourceState::Invalid {
            reason: "~/.bashrc does not exist".to_string(),
        });
        let stats = apply::converge(&ctx, &r, "configure");
        assert_eq!(stats.skipped, 1);
        assert_eq!(r.applies(), 0);
    }

    #[test]
    fn missing_and_stale_resources_are_applied() {
        let (ctx, _log) = make_static_context();
        for state in [ResourceState::Missing, stale()] {
            let r = scripted(state);
            let stats = apply::converge(&ctx, &r, "configure");
            assert_eq!(stats.changed, 1);
            assert_eq!(r.applies(), 1);
        }
    }

    #[test]
    fn dry_run_counts_without_applying() {
        let (mut ctx, _log) = make_static_context();
        ctx.dry_run = true;
        let r = scripted(stale());
        let stats = apply::converge(&ctx, &r, "configure");
        assert_eq!(stats.changed, 1);
        assert_eq!(r.applies(), 0);
    }

    #[test]
    fn apply_reporting_already_correct_counts_as_ok() {
        let (ctx, _log) = make_static_context();
        let r = scripted(ResourceState::Missing).applying(Ok(ResourceChange::AlreadyCorrect));
        assert_eq!(
            apply::converge(&ctx, &r, "configure").already_ok,
            1
        );
    }

    #[test]
    fn best_effort_counts_failures() {
        let (ctx, _log) = make_static_context();
        let skipped = scripted(ResourceState::Missing).applying(Ok(ResourceChange::Skipped {
            reason: "sudo not available".to_string(),
        }));
        let broken = scripted(ResourceState::Missing).applying(Err("disk full"));
        let unreadable = scripted(ResourceState::Missing).unreadable("permission denied");

        for r in [&skipped, &broken, &unreadable] {
            assert_eq!(apply::converge(&ctx, r, "configure").failed, 1);
        }
        assert_eq!(unreadable.applies(), 0);
    }

    #[test]
    fn best_effort_never_fails_the_list() {
        let (ctx, _log) = make_static_context();
        let resources = vec![
            scripted(ResourceState::Correct),
            scripted(ResourceState::Missing).unreadable("permission denied"),
            scripted(stale()).applying(Err("boom")),
            scripted(ResourceState::Missing),
        ];
        let result = process_resources(&ctx, resources, "configure");
        assert!(matches!(result, TaskResult::Ok));
    }

    #[test]
    fn boxed_resources_are_accepted() {
        let (ctx, _log) = make_static_context();
        let resources: Vec<Box<dyn Resource>> = vec![
            Box::new(scripted(ResourceState::Correct)),
            Box::new(scripted(ResourceState::Missing)),
        ];
        let result = process_resources(&ctx, resources, "set");
        assert!(matches!(result, TaskResult::Ok));
    }
}

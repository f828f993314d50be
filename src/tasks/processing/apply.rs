//! One resource: check, then converge.

use super::TaskStats;
use super::context::Context;
use crate::resources::{Resource, ResourceChange, ResourceState};

/// Check `resource` and apply it when it is not already correct.
pub(super) fn converge<R: Resource>(ctx: &Context, resource: &R, verb: &str) -> TaskStats {
    let desc = resource.description();
    let state = match resource.current_state() {
        Ok(state) => state,
        Err(e) => return failed(ctx, &format!("cannot check {desc}: {e:#}")),
    };

    if state.differs() {
        if !ctx.dry_run {
            return apply(ctx, resource, verb);
        }
        let detail = match state {
            ResourceState::Incorrect { current } => format!(" (currently {current})"),
            _ => String::new(),
        };
        ctx.log.dry_run(&format!("would {verb} {desc}{detail}"));
        return TaskStats::one(|s| s.changed += 1);
    }

    match state {
        ResourceState::Invalid { reason } => {
            ctx.log.warn(&format!("skipping {desc}: {reason}"));
            TaskStats::one(|s| s.skipped += 1)
        }
        _ => {
            ctx.log.debug(&format!("ok: {desc}"));
            TaskStats::one(|s| s.already_ok += 1)
        }
    }
}

fn apply<R: Resource>(ctx: &Context, resource: &R, verb: &str) -> TaskStats {
    let desc = resource.description();
    match resource.apply() {
        Ok(ResourceChange::Applied) => {
            ctx.log.info(&format!("{verb}: {desc}"));
            TaskStats::one(|s| s.changed += 1)
        }
        Ok(ResourceChange::AlreadyCorrect) => TaskStats::one(|s| s.already_ok += 1),
        Ok(ResourceChange::Skipped { reason }) => {
            failed(ctx, &format!("could not {verb} {desc}: {reason}"))
        }
        Err(e) => failed(ctx, &format!("could not {verb} {desc}: {e:#}")),
    }
}

/// Warn and count a failure.
fn failed(ctx: &Context, message: &str) -> TaskStats {
    ctx.log.warn(message);
    TaskStats::one(|s| s.failed += 1)
}

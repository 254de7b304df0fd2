//! Decides whether the hook has anything to do for a run.

use crate::types::InvocationContext;

/// Returns `true` when the run targets Android, is a release build, and
/// asks for signing or a bundle.
///
/// A `false` result means the whole pipeline is a no-op, not a failure.
pub fn should_run(ctx: &InvocationContext) -> bool {
    ctx.targets_android() && ctx.release && (ctx.sign || ctx.bundle)
}

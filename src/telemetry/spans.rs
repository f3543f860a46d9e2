//! Span helpers for polling cycles and fired tasks.

use tracing::Span;

use crate::model::TaskId;

/// Span covering one discovery + fire cycle.
pub fn start_cycle_span(cycle: u64) -> Span {
    tracing::info_span!("deferack.cycle", cycle)
}

/// Span covering the verify-then-commit step for one due task.
///
/// `task.outcome` is declared empty and filled by [`record_fire_outcome`].
pub fn start_fire_span(task_id: &TaskId) -> Span {
    tracing::info_span!(
        "deferack.fire",
        "task.id" = %task_id,
        "task.outcome" = tracing::field::Empty,
    )
}

/// Record how a fire ended on its span.
pub fn record_fire_outcome(span: &Span, outcome: &str) {
    span.record("task.outcome", outcome);
}

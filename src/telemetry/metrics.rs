//! Metric instrument factories for deferack.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! With no provider installed the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("deferack")
}

/// Counter: tasks armed with a fresh deferral.
pub fn tasks_armed() -> Counter<u64> {
    meter()
        .u64_counter("deferack.tasks.armed")
        .with_description("Tasks armed with a deferred acknowledgment")
        .build()
}

/// Counter: due tasks processed.
/// Labels: `outcome` ("acknowledged" | "skipped" | "verify_failed" | "update_failed").
pub fn tasks_fired() -> Counter<u64> {
    meter()
        .u64_counter("deferack.tasks.fired")
        .with_description("Due tasks processed by the fire pass")
        .build()
}

/// Counter: discovery polls that failed and were treated as empty.
pub fn discovery_failures() -> Counter<u64> {
    meter()
        .u64_counter("deferack.discovery.failures")
        .with_description("Failed task listings")
        .build()
}

/// Histogram: drawn deferral in seconds.
pub fn deferral_seconds() -> Histogram<f64> {
    meter()
        .f64_histogram("deferack.deferral.seconds")
        .with_description("Randomized deferral drawn per armed task")
        .with_unit("s")
        .build()
}

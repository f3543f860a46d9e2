//! The scheduler loop.
//!
//! Each cycle runs a discovery pass (list tasks in the target status, arm the
//! ones not already pending) and then a fire pass (collect due ids, re-verify
//! each, commit if still eligible, remove unconditionally). Then it sleeps.

use crate::clock::Clock;
use crate::error::Error;
use crate::model::{TaskId, status_eq};
use crate::source::TaskSource;
use crate::telemetry::metrics;
use crate::telemetry::spans::{record_fire_outcome, start_cycle_span, start_fire_span};
use opentelemetry::KeyValue;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, warn};

use super::delay::{DelayRange, fire_time};
use super::pending::PendingTable;

/// Static scheduling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Status that makes a task eligible.
    pub target_status: String,
    /// Status set once the deferral elapses.
    pub final_status: String,
    pub delay: DelayRange,
    pub poll_interval: Duration,
}

/// How a due task was resolved. Every variant is terminal for that arming.
#[derive(Debug)]
pub enum FireOutcome {
    Acknowledged,
    /// The task left the target status while deferred.
    Skipped { current: String },
    VerifyFailed(Error),
    UpdateFailed(Error),
}

impl FireOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Acknowledged => "acknowledged",
            Self::Skipped { .. } => "skipped",
            Self::VerifyFailed(_) => "verify_failed",
            Self::UpdateFailed(_) => "update_failed",
        }
    }
}

/// Counters describing what one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub fetch_failed: bool,
    /// Ids returned by discovery.
    pub discovered: usize,
    pub armed: usize,
    /// Discovered ids that were already pending and left untouched.
    pub already_pending: usize,
    pub fired: usize,
    pub acknowledged: usize,
    pub skipped: usize,
    pub verify_failed: usize,
    pub update_failed: usize,
    pub pending_after: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &FireOutcome) {
        self.fired += 1;
        match outcome {
            FireOutcome::Acknowledged => self.acknowledged += 1,
            FireOutcome::Skipped { .. } => self.skipped += 1,
            FireOutcome::VerifyFailed(_) => self.verify_failed += 1,
            FireOutcome::UpdateFailed(_) => self.update_failed += 1,
        }
    }
}

/// Stops [`DeferredScheduler::run_forever`] at the next cycle boundary.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // notify_one stores a permit if nobody is waiting yet
        self.notify.notify_one();
    }
}

pub struct DeferredScheduler {
    source: Arc<dyn TaskSource>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    pending: PendingTable,
    rng: StdRng,
    cycle: u64,
    shutdown: ShutdownHandle,
}

impl DeferredScheduler {
    pub fn new(source: Arc<dyn TaskSource>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            source,
            clock,
            config,
            pending: PendingTable::new(),
            rng: StdRng::from_os_rng(),
            cycle: 0,
            shutdown: ShutdownHandle::default(),
        }
    }

    /// Replace the deferral RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Read-only view of the armed tasks.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Cycle until the shutdown handle is triggered.
    ///
    /// Per-task failures never end the loop. Without a shutdown trigger this
    /// never returns.
    pub async fn run_forever(&mut self) {
        info!(
            target_status = %self.config.target_status,
            final_status = %self.config.final_status,
            min_delay_secs = self.config.delay.min().as_secs(),
            max_delay_secs = self.config.delay.max().as_secs(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "scheduler started"
        );

        let notify = Arc::clone(&self.shutdown.notify);
        loop {
            self.run_once().await;

            debug!(
                secs = self.config.poll_interval.as_secs(),
                "sleeping before next poll"
            );
            tokio::select! {
                _ = notify.notified() => {
                    info!(pending = self.pending.len(), "scheduler shutting down, pending tasks dropped");
                    return;
                }
                _ = self.clock.sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One discovery pass followed by one fire pass, without the idle sleep.
    pub async fn run_once(&mut self) -> CycleReport {
        self.cycle += 1;
        let span = start_cycle_span(self.cycle);
        async {
            let mut report = CycleReport {
                cycle: self.cycle,
                ..Default::default()
            };
            self.discover(&mut report).await;
            self.fire_due(&mut report).await;
            report.pending_after = self.pending.len();
            debug!(?report, "cycle finished");
            report
        }
        .instrument(span)
        .await
    }

    async fn discover(&mut self, report: &mut CycleReport) {
        let target = &self.config.target_status;
        let ids = match self.source.list_in_status(target).await {
            Ok(ids) => ids,
            Err(e) => {
                let err = Error::Fetch {
                    status: target.clone(),
                    source: Box::new(e),
                };
                warn!(error = %err, pending = self.pending.len(), "discovery failed, treating as empty poll");
                metrics::discovery_failures().add(1, &[]);
                report.fetch_failed = true;
                return;
            }
        };

        if ids.is_empty() {
            info!(status = %target, "no tasks found in target status");
            return;
        }

        let now = self.clock.now();
        for id in ids {
            report.discovered += 1;
            if self.pending.contains(&id) {
                report.already_pending += 1;
                continue;
            }
            let delay = self.config.delay.draw(&mut self.rng);
            let fire_at = fire_time(now, delay);
            if self.pending.arm(id.clone(), fire_at, self.cycle) {
                report.armed += 1;
                metrics::tasks_armed().add(1, &[]);
                metrics::deferral_seconds().record(delay.as_secs_f64(), &[]);
                info!(task_id = %id, delay_secs = delay.as_secs(), %fire_at, "task armed");
            }
        }
    }

    async fn fire_due(&mut self, report: &mut CycleReport) {
        let now = self.clock.now();
        let due = self.pending.due(now, self.cycle);

        for id in due {
            let outcome = self.fire(&id).await;
            // removal is unconditional once due
            self.pending.remove(&id);
            metrics::tasks_fired().add(1, &[KeyValue::new("outcome", outcome.label())]);
            report.record(&outcome);
        }
    }

    /// Re-verify a due task and commit the final status if still eligible.
    async fn fire(&self, id: &TaskId) -> FireOutcome {
        let span = start_fire_span(id);
        let outcome = self.verify_and_commit(id).instrument(span.clone()).await;
        record_fire_outcome(&span, outcome.label());

        span.in_scope(|| match &outcome {
            FireOutcome::Acknowledged => {
                info!(task_id = %id, status = %self.config.final_status, "task acknowledged");
            }
            FireOutcome::Skipped { current } => {
                info!(task_id = %id, %current, "task no longer in target status, skipping");
            }
            FireOutcome::VerifyFailed(e) => {
                warn!(task_id = %id, error = %e, "could not verify task, skipping");
            }
            FireOutcome::UpdateFailed(e) => {
                error!(task_id = %id, error = %e, "status update failed, not retrying");
            }
        });
        outcome
    }

    async fn verify_and_commit(&self, id: &TaskId) -> FireOutcome {
        let current = match self.source.get_status(id).await {
            Ok(status) => status,
            Err(e) => {
                return FireOutcome::VerifyFailed(Error::Verify {
                    id: id.clone(),
                    source: Box::new(e),
                });
            }
        };

        if !status_eq(&current, &self.config.target_status) {
            return FireOutcome::Skipped { current };
        }

        match self.source.set_status(id, &self.config.final_status).await {
            Ok(()) => FireOutcome::Acknowledged,
            Err(e) => FireOutcome::UpdateFailed(Error::Update {
                id: id.clone(),
                status: self.config.final_status.clone(),
                source: Box::new(e),
            }),
        }
    }
}

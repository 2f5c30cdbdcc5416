// Sync scheduler - Immediate pass on start, then one pass per interval boundary
use crate::application::clock::Clock;
use crate::application::sync_error::SyncError;
use crate::application::sync_orchestrator::SyncOrchestrator;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

enum SchedulerState {
    Idle,
    Running {
        cancel_token: CancellationToken,
        handle: JoinHandle<()>,
    },
}

pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    state: SchedulerState,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            orchestrator,
            interval,
            clock,
            state: SchedulerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SchedulerState::Running { .. })
    }

    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.is_running() {
            return Err(SyncError::AlreadyRunning);
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run_schedule(
            self.orchestrator.clone(),
            self.interval,
            self.clock.clone(),
            cancel_token.clone(),
        ));

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler started. Synchronization will occur every {} minutes",
            self.interval.as_secs() / 60
        );
        self.state = SchedulerState::Running { cancel_token, handle };
        Ok(())
    }

    /// Cancel the recurring trigger and wait for the schedule task to exit.
    /// An in-flight pass is abandoned.
    pub async fn shutdown(&mut self) {
        let SchedulerState::Running { cancel_token, handle } =
            std::mem::replace(&mut self.state, SchedulerState::Idle)
        else {
            return;
        };

        cancel_token.cancel();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scheduler task failed to join");
        }
        tracing::info!("Scheduler shut down");
    }
}

async fn run_schedule(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    cancel_token: CancellationToken,
) {
    if !run_guarded_pass(&orchestrator, &cancel_token).await {
        return;
    }

    let mut last_fired = None;
    loop {
        let now = clock.now_utc();
        let next = next_trigger(now, last_fired, interval);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::debug!(next_run = %next, "Waiting for next sync trigger");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel_token.cancelled() => break,
        }

        last_fired = Some(next);
        if !run_guarded_pass(&orchestrator, &cancel_token).await {
            break;
        }

        let missed = missed_boundaries(next, clock.now_utc(), interval);
        if missed > 0 {
            tracing::warn!(missed, "Sync pass overran its interval, skipping missed triggers");
        }
    }
}

/// Runs one pass in its own task so a panic is contained. Returns `false`
/// when cancelled mid-pass.
async fn run_guarded_pass(orchestrator: &Arc<SyncOrchestrator>, cancel_token: &CancellationToken) -> bool {
    let orchestrator = orchestrator.clone();
    let mut pass = tokio::spawn(async move { orchestrator.run_sync_pass().await });

    tokio::select! {
        result = &mut pass => {
            match result {
                Ok(summary) => tracing::debug!(?summary, "Sync pass finished"),
                Err(e) if e.is_panic() => tracing::error!(error = %e, "Sync pass panicked, continuing schedule"),
                Err(e) => tracing::error!(error = %e, "Sync pass aborted"),
            }
            true
        }
        _ = cancel_token.cancelled() => {
            pass.abort();
            tracing::info!("Abandoning in-flight sync pass");
            false
        }
    }
}

/// First instant strictly after `now` that is a whole multiple of `interval`
/// since the Unix epoch. For 10 minutes this is the next `:00`, `:10`, … `:50`.
pub fn next_boundary(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = interval.as_millis().max(1) as i64;
    let millis = now.timestamp_millis();
    let next = (millis.div_euclid(step) + 1) * step;
    Utc.timestamp_millis_opt(next).single().unwrap_or(now)
}

/// Next boundary to fire at. Never at or before `last_fired`, so a wall
/// clock that reads behind the timer that woke us cannot repeat a boundary.
pub fn next_trigger(now: DateTime<Utc>, last_fired: Option<DateTime<Utc>>, interval: Duration) -> DateTime<Utc> {
    let from = last_fired.map_or(now, |fired| fired.max(now));
    next_boundary(from, interval)
}

/// Boundaries after `scheduled` that had already passed by `finished`.
pub fn missed_boundaries(scheduled: DateTime<Utc>, finished: DateTime<Utc>, interval: Duration) -> u64 {
    let step = interval.as_millis().max(1) as i64;
    let overrun = (finished - scheduled).num_milliseconds();
    if overrun <= 0 { 0 } else { (overrun / step) as u64 }
}

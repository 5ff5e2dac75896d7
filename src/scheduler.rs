use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::models::ChangeRecord;
use crate::plugins::Notifier;
use crate::sync_engine::{PassReport, SyncEngine};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Anything that can run one synchronization pass.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_pass(&self) -> Result<PassReport, AppError>;
}

#[async_trait]
impl PassRunner for SyncEngine {
    async fn run_pass(&self) -> Result<PassReport, AppError> {
        SyncEngine::run_pass(self).await
    }
}

type SharedPass = Shared<BoxFuture<'static, Result<PassReport, String>>>;

/// Drives passes on a fixed interval and hands their changes to the notifier.
///
/// At most one pass runs at a time. A caller asking for a pass while one is
/// in flight waits for it and gets its report.
pub struct Scheduler {
    runner: Arc<dyn PassRunner>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    state: Arc<watch::Sender<SchedulerState>>,
    in_flight: Mutex<Option<SharedPass>>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn PassRunner>, notifier: Arc<dyn Notifier>, config: SchedulerConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            runner,
            notifier,
            config,
            state: Arc::new(state),
            in_flight: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Loop until `cancel` fires. A pass in progress is allowed to finish.
    pub async fn run(&self, cancel: CancellationToken) {
        let initial_delay = Duration::from_secs(self.config.initial_delay_secs);
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let backoff = Duration::from_secs(self.config.fault_backoff_secs);

        tracing::info!(
            "Scheduler started: first pass in {:?}, then every {:?}",
            initial_delay,
            period
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                self.stop();
                return;
            }
            _ = sleep(initial_delay) => {}
        }

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.sync_now().await {
                tracing::error!("Sync pass failed, retrying in {:?}: {}", backoff, e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(backoff) => {}
                }
                ticker.reset_immediately();
            }
        }

        self.stop();
    }

    /// Run a pass now, or join the one already in flight.
    pub async fn sync_now(&self) -> Result<PassReport, AppError> {
        let pass = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(pass) => {
                    tracing::debug!("Joining the pass already in flight");
                    pass.clone()
                }
                None => {
                    let pass = self.start_pass();
                    *in_flight = Some(pass.clone());
                    pass
                }
            }
        };

        let result = pass.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|current| current.ptr_eq(&pass)) {
            *in_flight = None;
        }

        result.map_err(AppError::Engine)
    }

    /// The pass runs on its own task so it completes even when every caller
    /// has gone away, and a panic inside it surfaces as an engine fault.
    fn start_pass(&self) -> SharedPass {
        let runner = Arc::clone(&self.runner);
        let notifier = Arc::clone(&self.notifier);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            let _running = RunningGuard::enter(state);
            let result = runner.run_pass().await;
            if let Ok(report) = &result {
                deliver(notifier.as_ref(), &report.changes).await;
            }

            result.map_err(|e| match e {
                AppError::Engine(message) => message,
                other => other.to_string(),
            })
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(format!("sync pass aborted: {}", e)),
            }
        }
        .boxed()
        .shared()
    }

    fn stop(&self) {
        self.state.send_replace(SchedulerState::Stopped);
        tracing::info!("Scheduler stopped");
    }
}

/// Marks the scheduler Running for as long as it lives, including while a
/// panicking pass unwinds.
struct RunningGuard(Arc<watch::Sender<SchedulerState>>);

impl RunningGuard {
    fn enter(state: Arc<watch::Sender<SchedulerState>>) -> Self {
        set_state(&state, SchedulerState::Running);
        Self(state)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        set_state(&self.0, SchedulerState::Idle);
    }
}

/// Stopped is terminal; a late pass finishing must not revive the state.
fn set_state(state: &watch::Sender<SchedulerState>, next: SchedulerState) {
    state.send_if_modified(|current| {
        if *current == SchedulerState::Stopped || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn deliver(notifier: &dyn Notifier, changes: &[ChangeRecord]) {
    if changes.is_empty() {
        return;
    }

    tracing::info!("Delivering {} price changes", changes.len());
    for change in changes {
        if let Err(e) = notifier.notify_change(change).await {
            tracing::error!("Failed to deliver change for {}: {}", change.external_id(), e);
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use ytsort_core::ApiErrorClass;

use super::apply::SyncReport;
use super::engine::{PassError, SortEngine};
use super::plan::SortDirection;
use super::remote::PlaylistRemote;
use crate::notify::{Notifier, SUCCESS_MESSAGE, failure_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    AwaitingShutdown,
    Stopped,
}

/// Runs a sort pass on a fixed interval until shut down.
pub struct CycleDriver<R: ?Sized> {
    engine: SortEngine<R>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    run_on_start: bool,
    state: watch::Sender<DriverState>,
    passes: u64,
}

impl<R> CycleDriver<R>
where
    R: PlaylistRemote + ?Sized,
{
    pub fn new(engine: SortEngine<R>, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        let (state, _) = watch::channel(DriverState::Idle);
        Self {
            engine,
            notifier,
            interval: interval.max(Duration::from_millis(1)),
            run_on_start: false,
            state,
            passes: 0,
        }
    }

    /// Runs the first pass immediately instead of one interval after start.
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    /// Drives passes until `shutdown` fires and returns how many ran.
    ///
    /// A pass in progress when `shutdown` fires is allowed to finish.
    /// `abort` is handed to every pass; firing it abandons in-flight updates.
    pub async fn run(mut self, shutdown: CancellationToken, abort: CancellationToken) -> u64 {
        let first_tick = if self.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = tokio::time::interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.state.send_replace(DriverState::Running);
            self.passes += 1;
            let pass_token = abort.child_token();
            let pass = self.run_pass(self.passes, &pass_token);
            tokio::pin!(pass);
            let mut draining = false;
            loop {
                tokio::select! {
                    _ = &mut pass => break,
                    _ = shutdown.cancelled(), if !draining => {
                        tracing::info!("shutdown requested: wait for current sorting before exit");
                        self.state.send_replace(DriverState::AwaitingShutdown);
                        draining = true;
                    }
                }
            }
            if draining {
                break;
            }
            self.state.send_replace(DriverState::Idle);
        }

        self.state.send_replace(DriverState::Stopped);
        tracing::info!(passes = self.passes, "sort cycle stopped");
        self.passes
    }

    async fn run_pass(
        &self,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, PassError> {
        let settings = self.engine.settings();
        let reverse = settings.direction == SortDirection::Descending;
        let span = tracing::info_span!(
            "pass",
            pass = number,
            playlist = %settings.playlist_id,
            reverse,
            dry_run = settings.dry_run,
        );
        async {
            let outcome = self.engine.run_pass(cancel).await;
            match &outcome {
                Ok(report) => {
                    tracing::info!(
                        moved = report.moved,
                        skipped = report.skipped,
                        "playlist sorted"
                    );
                    self.notify(SUCCESS_MESSAGE).await;
                }
                Err(err) => {
                    match err.classification() {
                        Some(ApiErrorClass::Auth) => tracing::error!(
                            error = %err,
                            "sort pass failed: access token rejected, provide a fresh one"
                        ),
                        Some(ApiErrorClass::Quota) => tracing::error!(
                            error = %err,
                            "sort pass failed: daily API quota exhausted"
                        ),
                        class => tracing::error!(class = ?class, error = %err, "sort pass failed"),
                    }
                    self.notify(&failure_message(err)).await;
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn notify(&self, message: &str) {
        if let Err(err) = self.notifier.notify(message).await {
            tracing::error!(error = %err, "fail to send notification");
        }
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use ytsort_core::{ApiErrorClass, YoutubeError};

use super::plan::PositionPlan;
use super::remote::{PlaylistRemote, PositionUpdate};

pub const DEFAULT_MAX_CONCURRENT_UPDATES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub max_concurrent: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT_UPDATES,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub moved: usize,
    pub skipped: usize,
    pub dry_run: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Remote(#[from] YoutubeError),
    #[error("update cancelled")]
    Cancelled,
    #[error("update task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("failure collector stopped, failures of this sweep were lost: {0}")]
    Collector(#[source] tokio::task::JoinError),
}

impl UpdateError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            Self::Remote(err) => err.classification(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct UpdateFailure {
    pub video_id: String,
    pub target: u32,
    pub error: UpdateError,
}

impl fmt::Display for UpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let UpdateError::Collector(_) = self.error {
            return write!(f, "{}", self.error);
        }
        write!(
            f,
            "cannot move video {} to position {}: {}",
            self.video_id, self.target, self.error
        )
    }
}

/// Every update failure of one sweep.
#[derive(Debug, Default)]
pub struct UpdateFailures(Vec<UpdateFailure>);

impl UpdateFailures {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpdateFailure> {
        self.0.iter()
    }

    /// Class of the first failure the API classified, if any.
    pub fn classification(&self) -> Option<ApiErrorClass> {
        self.0.iter().find_map(|failure| failure.error.classification())
    }
}

impl fmt::Display for UpdateFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            write!(f, "1 error occurred:")?;
        } else {
            write!(f, "{} errors occurred:", self.0.len())?;
        }
        for failure in &self.0 {
            write!(f, "\n\t* {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UpdateFailures {}

/// Funnels failures from concurrent update tasks into a single owner.
struct FailureCollector {
    tx: mpsc::UnboundedSender<UpdateFailure>,
    handle: tokio::task::JoinHandle<UpdateFailures>,
}

impl FailureCollector {
    fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<UpdateFailure>();
        let handle = tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(failure) = rx.recv().await {
                failures.push(failure);
            }
            UpdateFailures(failures)
        });
        Self { tx, handle }
    }

    fn sender(&self) -> mpsc::UnboundedSender<UpdateFailure> {
        self.tx.clone()
    }

    fn record(&self, failure: UpdateFailure) {
        let _ = self.tx.send(failure);
    }

    /// Closes the channel and returns everything recorded.
    ///
    /// A collector that died is reported as a single failure.
    async fn finish(self) -> UpdateFailures {
        drop(self.tx);
        match self.handle.await {
            Ok(failures) => failures,
            Err(err) => {
                tracing::error!(error = %err, "failure collector stopped");
                UpdateFailures(vec![UpdateFailure {
                    video_id: String::new(),
                    target: 0,
                    error: UpdateError::Collector(err),
                }])
            }
        }
    }
}

/// Applies `plan` to the remote playlist.
///
/// Items already at their target are skipped. At most
/// `options.max_concurrent` updates are in flight; a failed update never
/// stops the others. Returns once every scheduled update has finished.
/// Firing `cancel` abandons in-flight calls and records the remaining
/// updates as cancelled.
pub async fn apply_plan<R>(
    remote: Arc<R>,
    playlist_id: &str,
    plan: PositionPlan,
    options: SyncOptions,
    cancel: &CancellationToken,
) -> Result<SyncReport, UpdateFailures>
where
    R: PlaylistRemote + ?Sized,
{
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let collector = FailureCollector::spawn();
    let mut tasks = JoinSet::new();
    let mut scheduled = HashMap::new();
    let mut report = SyncReport::default();

    for entry in plan {
        let video_id = entry.item.video_id;
        let target = entry.target;
        let current = entry.item.position;
        if current == target {
            tracing::debug!(video = %video_id, position = target, "already at the wanted position");
            report.skipped += 1;
            continue;
        }
        if options.dry_run {
            tracing::info!(
                video = %video_id,
                from = current,
                to = target,
                "[dry run] moving video at position [{target}], was at position [{current}]"
            );
            report.dry_run += 1;
            continue;
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            collector.record(UpdateFailure {
                video_id,
                target,
                error: UpdateError::Cancelled,
            });
            continue;
        };

        let update = PositionUpdate {
            handle: entry.item.handle,
            video_id: video_id.clone(),
            playlist_id: playlist_id.to_string(),
            position: target,
        };
        let remote = Arc::clone(&remote);
        let failures = collector.sender();
        let cancel = cancel.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            tracing::info!(video = %update.video_id, position = update.position, "moving video to position [{}]", update.position);
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(UpdateError::Cancelled),
                result = remote.update_position(&update) => result.map_err(UpdateError::from),
            };
            match result {
                Ok(()) => true,
                Err(error) => {
                    tracing::error!(
                        video = %update.video_id,
                        class = ?error.classification(),
                        error = %error,
                        "cannot update video in the playlist"
                    );
                    let _ = failures.send(UpdateFailure {
                        video_id: update.video_id,
                        target: update.position,
                        error,
                    });
                    false
                }
            }
        });
        scheduled.insert(handle.id(), (video_id, target));
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, true)) => report.moved += 1,
            Ok((_, false)) => {}
            Err(err) => {
                let (video_id, target) = scheduled.remove(&err.id()).unwrap_or_default();
                collector.record(UpdateFailure {
                    video_id,
                    target,
                    error: UpdateError::Task(err),
                });
            }
        }
    }

    let failures = collector.finish().await;
    tracing::info!(
        moved = report.moved,
        skipped = report.skipped,
        dry_run = report.dry_run,
        failed = failures.len(),
        "position sweep finished"
    );
    if failures.is_empty() {
        Ok(report)
    } else {
        Err(failures)
    }
}

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use ytsort_core::ApiErrorClass;

use super::apply::{SyncOptions, SyncReport, UpdateFailures, apply_plan};
use super::collection::{ListingError, MEMBER_PAGE_SIZE, list_collection};
use super::enrich::{EnrichError, MAX_IDS_PER_LOOKUP, enrich_durations};
use super::plan::{PlanError, SortDirection, plan_positions};
use super::remote::PlaylistRemote;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("fail to list playlist items: {0}")]
    Listing(#[from] ListingError),
    #[error("fail to get video details: {0}")]
    Enrichment(#[from] EnrichError),
    #[error("fail to plan positions: {0}")]
    Plan(#[from] PlanError),
    #[error("{0}")]
    Updates(#[from] UpdateFailures),
}

impl PassError {
    /// How the API classified the error behind this failure, if it came
    /// from the API.
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            Self::Listing(ListingError::Remote(err)) => err.classification(),
            Self::Listing(ListingError::StuckCursor(_)) | Self::Plan(_) => None,
            Self::Enrichment(err) => err.remote().and_then(|err| err.classification()),
            Self::Updates(failures) => failures.classification(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSettings {
    pub playlist_id: String,
    pub direction: SortDirection,
    pub dry_run: bool,
    pub max_concurrent_updates: usize,
}

impl SortSettings {
    pub fn new(playlist_id: impl Into<String>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            direction: SortDirection::Ascending,
            dry_run: false,
            max_concurrent_updates: super::apply::DEFAULT_MAX_CONCURRENT_UPDATES,
        }
    }
}

pub struct SortEngine<R: ?Sized> {
    remote: Arc<R>,
    settings: SortSettings,
}

impl<R> SortEngine<R>
where
    R: PlaylistRemote + ?Sized,
{
    pub fn new(remote: Arc<R>, settings: SortSettings) -> Self {
        Self { remote, settings }
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    /// Runs one listing, enrichment, planning and update sweep.
    ///
    /// Listing, enrichment and planning errors abort before any update is
    /// sent.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<SyncReport, PassError> {
        let settings = &self.settings;
        self.log_account().await;

        tracing::debug!("listing playlist items");
        let mut collection =
            list_collection(self.remote.as_ref(), &settings.playlist_id, MEMBER_PAGE_SIZE).await?;
        tracing::info!("found {} items in the playlist", collection.len());

        let stats =
            enrich_durations(self.remote.as_ref(), &mut collection, MAX_IDS_PER_LOOKUP).await?;
        tracing::debug!(
            chunks = stats.chunks,
            enriched = stats.enriched,
            unparsable = stats.unparsable,
            "video details merged"
        );

        if settings.direction == SortDirection::Descending {
            tracing::info!("sorting in reverse order");
        }
        let plan = plan_positions(collection, settings.direction)?;

        let report = apply_plan(
            Arc::clone(&self.remote),
            &settings.playlist_id,
            plan,
            SyncOptions {
                dry_run: settings.dry_run,
                max_concurrent: settings.max_concurrent_updates,
            },
            cancel,
        )
        .await?;
        Ok(report)
    }

    async fn log_account(&self) {
        match self.remote.account().await {
            Ok(Some(email)) => tracing::debug!("connected as {email}"),
            Ok(None) => {}
            Err(err) => tracing::warn!(
                class = ?err.classification(),
                error = %err,
                "cannot get user info"
            ),
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

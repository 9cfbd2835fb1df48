use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use ytsort_core::YoutubeClient;

use crate::notify::{LogNotifier, Notifier};
use crate::sort::apply::DEFAULT_MAX_CONCURRENT_UPDATES;
use crate::sort::driver::{CycleDriver, DriverState};
use crate::sort::engine::{SortEngine, SortSettings};
use crate::sort::plan::SortDirection;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_INTERVAL_SECS: u64 = 12 * 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const ACCESS_TOKEN_ENV: &str = "YTSORT_ACCESS_TOKEN";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("playlist id must not be empty")]
    EmptyPlaylist,
    #[error("interval must be at least one second")]
    IntervalTooShort,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("{ACCESS_TOKEN_ENV} is not set")]
    MissingToken,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaemonConfig {
    pub playlist_id: String,
    pub interval: Duration,
    pub direction: SortDirection,
    pub dry_run: bool,
    pub run_on_start: bool,
    pub max_concurrent_updates: usize,
    pub request_timeout: Duration,
    pub api_base_url: String,
}

impl DaemonConfig {
    pub fn new(playlist_id: impl Into<String>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            direction: SortDirection::Ascending,
            dry_run: false,
            run_on_start: false,
            max_concurrent_updates: DEFAULT_MAX_CONCURRENT_UPDATES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.playlist_id.trim().is_empty() {
            return Err(ConfigError::EmptyPlaylist);
        }
        if self.interval < Duration::from_secs(1) {
            return Err(ConfigError::IntervalTooShort);
        }
        if self.max_concurrent_updates == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    fn sort_settings(&self) -> SortSettings {
        SortSettings {
            playlist_id: self.playlist_id.clone(),
            direction: self.direction,
            dry_run: self.dry_run,
            max_concurrent_updates: self.max_concurrent_updates,
        }
    }
}

pub struct DaemonRuntime {
    config: DaemonConfig,
    driver: CycleDriver<YoutubeClient>,
}

impl DaemonRuntime {
    pub fn bootstrap(config: DaemonConfig, access_token: String) -> anyhow::Result<Self> {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new(&config.playlist_id));
        Self::bootstrap_with_notifier(config, access_token, notifier)
    }

    pub fn bootstrap_with_notifier(
        config: DaemonConfig,
        access_token: String,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;
        let client = YoutubeClient::with_timeout(
            &config.api_base_url,
            access_token,
            config.request_timeout,
        )
        .context("failed to build YouTube client")?;
        let engine = SortEngine::new(Arc::new(client), config.sort_settings());
        let driver = CycleDriver::new(engine, notifier, config.interval)
            .with_run_on_start(config.run_on_start);
        Ok(Self { config, driver })
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<DriverState> {
        self.driver.subscribe()
    }

    /// Runs until interrupted. The first interrupt lets the current pass
    /// finish; a second one aborts its in-flight updates.
    pub async fn run(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let signals = tokio::spawn(watch_signals(shutdown.clone(), abort.clone()));
        let result = self.run_until(shutdown, abort).await;
        signals.abort();
        result
    }

    pub async fn run_until(
        self,
        shutdown: CancellationToken,
        abort: CancellationToken,
    ) -> anyhow::Result<()> {
        tracing::info!(
            playlist = %self.config.playlist_id,
            interval_secs = self.config.interval.as_secs(),
            reverse = self.config.direction == SortDirection::Descending,
            dry_run = self.config.dry_run,
            run_on_start = self.config.run_on_start,
            "started"
        );
        let passes = self.driver.run(shutdown, abort).await;
        tracing::info!(passes, "exiting");
        Ok(())
    }
}

/// Reads the OAuth access token handed to the daemon by its environment.
pub fn resolve_access_token() -> Result<String, ConfigError> {
    access_token_from(std::env::var(ACCESS_TOKEN_ENV).ok())
}

fn access_token_from(raw: Option<String>) -> Result<String, ConfigError> {
    raw.map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(ConfigError::MissingToken)
}

async fn watch_signals(shutdown: CancellationToken, abort: CancellationToken) {
    if let Err(err) = wait_for_signal().await {
        tracing::error!(error = %err, "failed waiting for shutdown signal");
        return;
    }
    tracing::info!("interrupt received, finishing current pass before exit");
    shutdown.cancel();

    if wait_for_signal().await.is_ok() {
        tracing::warn!("second interrupt received, aborting in-flight updates");
        abort.cancel();
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;

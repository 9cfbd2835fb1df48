use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use ytsortd::daemon::{
    DEFAULT_API_BASE_URL, DEFAULT_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DaemonConfig,
    DaemonRuntime, resolve_access_token,
};
use ytsortd::sort::apply::DEFAULT_MAX_CONCURRENT_UPDATES;
use ytsortd::sort::plan::SortDirection;

#[derive(Debug, Parser)]
#[command(
    name = "ytsortd",
    about = "Keeps a YouTube playlist sorted by video duration"
)]
struct Cli {
    /// Playlist to keep sorted
    #[arg(long, env = "YTSORT_PLAYLIST")]
    playlist: String,
    /// Seconds between two sort passes
    #[arg(long, env = "YTSORT_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval_secs: u64,
    /// Longest videos first
    #[arg(long, env = "YTSORT_REVERSE")]
    reverse: bool,
    /// Log the moves without sending them
    #[arg(long, env = "YTSORT_DRY_RUN")]
    dry_run: bool,
    /// Run the first pass right away instead of after one interval
    #[arg(long, env = "YTSORT_RUN_ON_START")]
    run_on_start: bool,
    /// Maximum position updates in flight
    #[arg(long, env = "YTSORT_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENT_UPDATES)]
    concurrency: usize,
    #[arg(
        long,
        env = "YTSORT_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    request_timeout_secs: u64,
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "YTSORT_LOG_LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long, env = "YTSORT_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,
}

impl Cli {
    fn into_config(self) -> DaemonConfig {
        DaemonConfig {
            playlist_id: self.playlist,
            interval: Duration::from_secs(self.interval_secs),
            direction: SortDirection::from_reverse(self.reverse),
            dry_run: self.dry_run,
            run_on_start: self.run_on_start,
            max_concurrent_updates: self.concurrency,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            api_base_url: self.api_base_url,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = cli.into_config();
    let token = resolve_access_token()?;
    let daemon = DaemonRuntime::bootstrap(config, token)?;
    daemon.run().await
}

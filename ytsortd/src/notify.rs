use async_trait::async_trait;
use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Playlist successfully sorted!";
const FAILURE_PREFIX: &str = "Error(s) occurred during last sort:\n";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification transport failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// Best-effort sink for pass outcomes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    playlist_url: String,
}

impl LogNotifier {
    pub fn new(playlist_id: &str) -> Self {
        Self {
            playlist_url: playlist_url(playlist_id),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "ytsortd::notify", url = %self.playlist_url, "{message}");
        Ok(())
    }
}

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={playlist_id}")
}

pub fn failure_message(error: &dyn std::error::Error) -> String {
    format!("{FAILURE_PREFIX}{error}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_carries_error_text() {
        let err = std::io::Error::other("boom");
        assert_eq!(
            failure_message(&err),
            "Error(s) occurred during last sort:\nboom"
        );
    }

    #[test]
    fn playlist_url_points_at_playlist() {
        assert_eq!(
            playlist_url("PL123"),
            "https://www.youtube.com/playlist?list=PL123"
        );
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier::new("PL123");
        notifier.notify(SUCCESS_MESSAGE).await.unwrap();
    }
}

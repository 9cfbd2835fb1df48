use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ytsort_core::{StatusCode, YoutubeError};

use super::remote::{
    AttributePage, AttributeRecord, MemberPage, MemberRecord, PlaylistRemote, PositionUpdate,
};

/// In-memory remote that records every call it receives.
#[derive(Default)]
pub struct SpyRemote {
    member_pages: Vec<Vec<MemberRecord>>,
    failing_member_page: Option<usize>,
    durations: HashMap<String, String>,
    failing_attribute_call: Option<usize>,
    attribute_page_limit: Option<usize>,
    repeat_attribute_token: bool,
    failing_updates: HashSet<String>,
    update_delay: Option<Duration>,
    account: Option<String>,
    failing_account: bool,
    failure_status: Option<StatusCode>,
    member_calls: AtomicUsize,
    attribute_calls: Mutex<Vec<Vec<String>>>,
    updates: Mutex<Vec<PositionUpdate>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SpyRemote {
    pub fn with_member_pages(mut self, pages: Vec<Vec<MemberRecord>>) -> Self {
        self.member_pages = pages;
        self
    }

    pub fn fail_member_page(mut self, index: usize) -> Self {
        self.failing_member_page = Some(index);
        self
    }

    pub fn with_duration(mut self, video_id: &str, raw: &str) -> Self {
        self.durations.insert(video_id.to_string(), raw.to_string());
        self
    }

    pub fn fail_attribute_call(mut self, index: usize) -> Self {
        self.failing_attribute_call = Some(index);
        self
    }

    /// Caps attribute pages below the requested page size.
    pub fn with_attribute_page_limit(mut self, limit: usize) -> Self {
        self.attribute_page_limit = Some(limit);
        self
    }

    /// Answers every continued attribute lookup with the token it was sent.
    pub fn repeat_attribute_page_token(mut self) -> Self {
        self.repeat_attribute_token = true;
        self
    }

    pub fn fail_update_for(mut self, video_id: &str) -> Self {
        self.failing_updates.insert(video_id.to_string());
        self
    }

    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    pub fn with_account(mut self, email: &str) -> Self {
        self.account = Some(email.to_string());
        self
    }

    pub fn fail_account(mut self) -> Self {
        self.failing_account = true;
        self
    }

    /// Status carried by every injected failure; 500 when unset.
    pub fn with_failure_status(mut self, status: StatusCode) -> Self {
        self.failure_status = Some(status);
        self
    }

    /// Playlist of `(video_id, duration, position)` served as a single page.
    pub fn with_playlist(mut self, entries: &[(&str, &str, u32)]) -> Self {
        let members = entries
            .iter()
            .map(|(video_id, raw, position)| {
                self.durations
                    .insert((*video_id).to_string(), (*raw).to_string());
                MemberRecord {
                    video_id: (*video_id).to_string(),
                    position: *position,
                    handle: format!("item-{video_id}"),
                }
            })
            .collect();
        self.member_pages = vec![members];
        self
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }

    pub fn attribute_calls(&self) -> Vec<Vec<String>> {
        self.attribute_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn updates(&self) -> Vec<PositionUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn injected_error(&self, message: &str) -> YoutubeError {
        YoutubeError::Api {
            status: self
                .failure_status
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: message.to_string(),
        }
    }
}

#[async_trait]
impl PlaylistRemote for SpyRemote {
    async fn list_members(
        &self,
        _playlist_id: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MemberPage, YoutubeError> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        let index = page_token
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        if self.failing_member_page == Some(index) {
            return Err(self.injected_error("member page failed"));
        }
        let members = self.member_pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < self.member_pages.len()).then(|| (index + 1).to_string());
        Ok(MemberPage {
            members,
            next_page_token,
        })
    }

    async fn list_attributes(
        &self,
        video_ids: &[String],
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<AttributePage, YoutubeError> {
        let call_index = {
            let mut calls = self
                .attribute_calls
                .lock()
                .map_err(|_| self.injected_error("spy poisoned"))?;
            calls.push(video_ids.to_vec());
            calls.len() - 1
        };
        if self.failing_attribute_call == Some(call_index) {
            return Err(self.injected_error("attribute page failed"));
        }
        let known: Vec<AttributeRecord> = video_ids
            .iter()
            .filter_map(|id| {
                self.durations.get(id).map(|raw| AttributeRecord {
                    video_id: id.clone(),
                    duration: Some(raw.clone()),
                })
            })
            .collect();
        let offset = page_token
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let page_size = self
            .attribute_page_limit
            .map_or(page_size as usize, |limit| limit.min(page_size as usize))
            .max(1);
        let end = (offset + page_size).min(known.len());
        let records = known.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = match page_token {
            Some(token) if self.repeat_attribute_token => Some(token.to_string()),
            _ => (end < known.len()).then(|| end.to_string()),
        };
        Ok(AttributePage {
            records,
            next_page_token,
        })
    }

    async fn update_position(&self, update: &PositionUpdate) -> Result<(), YoutubeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update.clone());
        }
        if self.failing_updates.contains(&update.video_id) {
            return Err(self.injected_error(&format!("cannot move {}", update.video_id)));
        }
        Ok(())
    }

    async fn account(&self) -> Result<Option<String>, YoutubeError> {
        if self.failing_account {
            return Err(YoutubeError::Api {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid credentials".into(),
            });
        }
        Ok(self.account.clone())
    }
}

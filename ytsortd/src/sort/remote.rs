use async_trait::async_trait;
use ytsort_core::{YoutubeClient, YoutubeError};

/// One playlist membership record as reported by the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub video_id: String,
    pub position: u32,
    pub handle: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemberPage {
    pub members: Vec<MemberRecord>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub video_id: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AttributePage {
    pub records: Vec<AttributeRecord>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub handle: String,
    pub video_id: String,
    pub playlist_id: String,
    pub position: u32,
}

/// Remote playlist operations the sort engine depends on.
#[async_trait]
pub trait PlaylistRemote: Send + Sync + 'static {
    async fn list_members(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MemberPage, YoutubeError>;

    async fn list_attributes(
        &self,
        video_ids: &[String],
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<AttributePage, YoutubeError>;

    async fn update_position(&self, update: &PositionUpdate) -> Result<(), YoutubeError>;

    /// Account the remote is authenticated as, if it can tell.
    async fn account(&self) -> Result<Option<String>, YoutubeError> {
        Ok(None)
    }
}

#[async_trait]
impl PlaylistRemote for YoutubeClient {
    async fn list_members(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MemberPage, YoutubeError> {
        let page = self
            .list_playlist_items(playlist_id, page_size, page_token)
            .await?;
        let mut members = Vec::with_capacity(page.items.len());
        for item in &page.items {
            let (Some(video_id), Some(position)) = (item.video_id(), item.position()) else {
                tracing::warn!(handle = %item.id, "playlist item has no video resource, skipping");
                continue;
            };
            members.push(MemberRecord {
                video_id: video_id.to_string(),
                position,
                handle: item.id.clone(),
            });
        }
        Ok(MemberPage {
            members,
            next_page_token: page.next_page_token,
        })
    }

    async fn list_attributes(
        &self,
        video_ids: &[String],
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<AttributePage, YoutubeError> {
        let page = self.list_videos(video_ids, page_size, page_token).await?;
        let records = page
            .items
            .into_iter()
            .map(|video| AttributeRecord {
                duration: video.content_details.and_then(|details| details.duration),
                video_id: video.id,
            })
            .collect();
        Ok(AttributePage {
            records,
            next_page_token: page.next_page_token,
        })
    }

    async fn update_position(&self, update: &PositionUpdate) -> Result<(), YoutubeError> {
        self.update_playlist_item_position(
            &update.handle,
            &update.playlist_id,
            &update.video_id,
            update.position,
        )
        .await?;
        Ok(())
    }

    async fn account(&self) -> Result<Option<String>, YoutubeError> {
        Ok(self.get_userinfo().await?.email)
    }
}

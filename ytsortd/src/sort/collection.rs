use std::collections::HashMap;
use std::collections::hash_map;
use std::time::Duration;

use ytsort_core::YoutubeError;

use super::remote::PlaylistRemote;

/// Page size requested from the membership listing.
pub const MEMBER_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub video_id: String,
    pub duration: Duration,
    pub position: u32,
    pub handle: String,
}

/// Playlist members keyed by video id. Rebuilt from a full listing every pass.
#[derive(Debug, Default)]
pub struct Collection {
    items: HashMap<String, Item>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for the item's video id.
    pub fn upsert(&mut self, item: Item) {
        self.items.insert(item.video_id.clone(), item);
    }

    pub fn get(&self, video_id: &str) -> Option<&Item> {
        self.items.get(video_id)
    }

    pub fn get_mut(&mut self, video_id: &str) -> Option<&mut Item> {
        self.items.get_mut(video_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Video ids ordered by their current playlist position.
    pub fn video_ids(&self) -> Vec<String> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        items.into_iter().map(|item| item.video_id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }
}

impl IntoIterator for Collection {
    type Item = Item;
    type IntoIter = hash_map::IntoValues<String, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing page failed: {0}")]
    Remote(#[from] YoutubeError),
    #[error("listing returned the same page token twice: {0}")]
    StuckCursor(String),
}

/// Drains every membership page of `playlist_id` into a fresh collection.
///
/// Any page error aborts the listing; a partial collection is never returned.
pub async fn list_collection<R>(
    remote: &R,
    playlist_id: &str,
    page_size: u32,
) -> Result<Collection, ListingError>
where
    R: PlaylistRemote + ?Sized,
{
    let mut collection = Collection::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = remote
            .list_members(playlist_id, page_size, page_token.as_deref())
            .await?;
        pages += 1;
        for member in page.members {
            collection.upsert(Item {
                video_id: member.video_id,
                duration: Duration::ZERO,
                position: member.position,
                handle: member.handle,
            });
        }
        match page.next_page_token {
            Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                return Err(ListingError::StuckCursor(next));
            }
            Some(next) if !next.is_empty() => page_token = Some(next),
            _ => break,
        }
    }
    tracing::debug!(pages, items = collection.len(), "playlist listing complete");
    Ok(collection)
}

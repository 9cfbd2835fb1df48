use ytsort_core::YoutubeError;

use super::collection::Collection;
use super::duration::parse_iso8601_duration;
use super::remote::PlaylistRemote;

/// Most ids the video lookup accepts in one request.
pub const MAX_IDS_PER_LOOKUP: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("video details lookup failed for chunk {chunk}: {source}")]
    Lookup {
        chunk: usize,
        #[source]
        source: YoutubeError,
    },
    #[error("video details for chunk {chunk} returned the same page token twice: {token}")]
    StuckCursor { chunk: usize, token: String },
}

impl EnrichError {
    /// Index of the chunk whose lookup failed.
    pub fn chunk(&self) -> usize {
        match self {
            Self::Lookup { chunk, .. } | Self::StuckCursor { chunk, .. } => *chunk,
        }
    }

    pub fn remote(&self) -> Option<&YoutubeError> {
        match self {
            Self::Lookup { source, .. } => Some(source),
            Self::StuckCursor { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub chunks: usize,
    pub enriched: usize,
    pub unparsable: usize,
    pub unknown: usize,
}

/// Splits `ids` into consecutive chunks of at most `size` ids.
pub fn chunk_ids(ids: &[String], size: usize) -> Vec<&[String]> {
    ids.chunks(size.max(1)).collect()
}

/// Looks up durations for every item of `collection`, one chunk at a time.
///
/// A failed lookup aborts the whole enrichment. A duration that does not
/// parse is logged and the item keeps a zero duration.
pub async fn enrich_durations<R>(
    remote: &R,
    collection: &mut Collection,
    batch_size: usize,
) -> Result<EnrichStats, EnrichError>
where
    R: PlaylistRemote + ?Sized,
{
    let batch_size = batch_size.clamp(1, MAX_IDS_PER_LOOKUP);
    let ids = collection.video_ids();
    let mut stats = EnrichStats::default();

    for (chunk_index, chunk) in chunk_ids(&ids, batch_size).into_iter().enumerate() {
        tracing::debug!(chunk = chunk_index, size = chunk.len(), "getting video details");
        stats.chunks += 1;
        let mut page_token: Option<String> = None;
        loop {
            let page = remote
                .list_attributes(chunk, batch_size as u32, page_token.as_deref())
                .await
                .map_err(|source| EnrichError::Lookup {
                    chunk: chunk_index,
                    source,
                })?;
            for record in page.records {
                let Some(item) = collection.get_mut(&record.video_id) else {
                    tracing::debug!(video = %record.video_id, "details for video not in playlist");
                    stats.unknown += 1;
                    continue;
                };
                let Some(raw) = record.duration.as_deref() else {
                    tracing::warn!(video = %record.video_id, "video has no duration");
                    stats.unparsable += 1;
                    continue;
                };
                match parse_iso8601_duration(raw) {
                    Ok(duration) => {
                        item.duration = duration;
                        stats.enriched += 1;
                    }
                    Err(err) => {
                        tracing::warn!(video = %record.video_id, error = %err, "cannot parse duration string");
                        stats.unparsable += 1;
                    }
                }
            }
            match page.next_page_token {
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    return Err(EnrichError::StuckCursor {
                        chunk: chunk_index,
                        token: next,
                    });
                }
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
    }

    Ok(stats)
}

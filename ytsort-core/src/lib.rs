mod client;

pub use client::{
    ApiErrorClass, ContentDetails, PlaylistItem, PlaylistItemPage, PlaylistItemSnippet,
    ResourceId, UserInfo, Video, VideoPage, YoutubeClient, YoutubeError,
};
pub use reqwest::StatusCode;

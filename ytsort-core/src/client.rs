use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const VIDEO_RESOURCE_KIND: &str = "youtube#video";

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    Quota,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct YoutubeClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl YoutubeClient {
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, YoutubeError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    /// Builds a client whose every request is bounded by `timeout`.
    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, YoutubeError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    pub async fn get_userinfo(&self) -> Result<UserInfo, YoutubeError> {
        let url = self.endpoint("/oauth2/v2/userinfo")?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Fetches one page of a playlist's membership records.
    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemPage, YoutubeError> {
        let mut url = self.endpoint("/youtube/v3/playlistItems")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "id,snippet")
                .append_pair("playlistId", playlist_id)
                .append_pair("maxResults", &max_results.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Fetches one page of content details for the given video ids.
    ///
    /// The API rejects more than 50 ids per request; callers chunk.
    pub async fn list_videos(
        &self,
        ids: &[String],
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoPage, YoutubeError> {
        let mut url = self.endpoint("/youtube/v3/videos")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "id,contentDetails")
                .append_pair("id", &ids.join(","))
                .append_pair("maxResults", &max_results.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn update_playlist_item_position(
        &self,
        item_id: &str,
        playlist_id: &str,
        video_id: &str,
        position: u32,
    ) -> Result<PlaylistItem, YoutubeError> {
        let mut url = self.endpoint("/youtube/v3/playlistItems")?;
        url.query_pairs_mut().append_pair("part", "snippet");
        let body = PlaylistItemUpdate {
            id: item_id,
            snippet: PlaylistItemUpdateSnippet {
                playlist_id,
                resource_id: ResourceIdRef {
                    kind: VIDEO_RESOURCE_KIND,
                    video_id,
                },
                position,
            },
        };
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, YoutubeError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, YoutubeError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(YoutubeError::Api { status, body })
        }
    }
}

impl YoutubeError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            YoutubeError::Api { status, body } => Some(classify_api_status(*status, body)),
            _ => None,
        }
    }
}

fn classify_api_status(status: StatusCode, body: &str) -> ApiErrorClass {
    // Google reports an exhausted daily quota as 403 with a quotaExceeded reason.
    if status == StatusCode::FORBIDDEN && body.contains("quotaExceeded") {
        ApiErrorClass::Quota
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT)
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemPage {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PlaylistItem {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: String,
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ContentDetails {
    /// ISO 8601 duration such as `PT4M13S`.
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Serialize)]
struct PlaylistItemUpdate<'a> {
    id: &'a str,
    snippet: PlaylistItemUpdateSnippet<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemUpdateSnippet<'a> {
    playlist_id: &'a str,
    resource_id: ResourceIdRef<'a>,
    position: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceIdRef<'a> {
    kind: &'a str,
    video_id: &'a str,
}

impl PlaylistItem {
    /// Video id of the member, when the record still points to a video.
    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()?
            .resource_id
            .as_ref()?
            .video_id
            .as_deref()
    }

    pub fn position(&self) -> Option<u32> {
        self.snippet.as_ref()?.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: StatusCode, body: &str) -> YoutubeError {
        YoutubeError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn classifies_quota_separately_from_auth() {
        let quota = api_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#,
        );
        assert_eq!(quota.classification(), Some(ApiErrorClass::Quota));

        let auth = api_error(StatusCode::UNAUTHORIZED, "invalid credentials");
        assert_eq!(auth.classification(), Some(ApiErrorClass::Auth));
    }

    #[test]
    fn classifies_throttling_and_server_errors() {
        assert_eq!(
            api_error(StatusCode::SERVICE_UNAVAILABLE, "").classification(),
            Some(ApiErrorClass::Transient)
        );
        assert_eq!(
            api_error(StatusCode::TOO_MANY_REQUESTS, "").classification(),
            Some(ApiErrorClass::RateLimit)
        );
        assert_eq!(
            api_error(StatusCode::NOT_FOUND, "").classification(),
            Some(ApiErrorClass::Permanent)
        );
    }

    #[test]
    fn video_id_requires_resource() {
        let item = PlaylistItem {
            id: "PLI1".into(),
            snippet: Some(PlaylistItemSnippet {
                playlist_id: None,
                position: Some(3),
                title: None,
                resource_id: None,
            }),
        };
        assert_eq!(item.video_id(), None);
        assert_eq!(item.position(), Some(3));
    }

    #[test]
    fn missing_position_is_not_defaulted() {
        let item: PlaylistItem = serde_json::from_value(serde_json::json!({
            "id": "PLI2",
            "snippet": {
                "playlistId": "PL1",
                "resourceId": { "kind": "youtube#video", "videoId": "vid" }
            }
        }))
        .unwrap();
        assert_eq!(item.video_id(), Some("vid"));
        assert_eq!(item.position(), None);
    }
}

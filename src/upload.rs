//! YouTube Data API v3 uploads, one OAuth token file per account label.

use crate::error::{PipelineError, Result};
use crate::lang::Language;
use crate::metadata::sanitize_with_fallback;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";
const THUMBNAIL_URL: &str = "https://www.googleapis.com/upload/youtube/v3/thumbnails/set";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DESCRIPTION_MAX: usize = 5000;
const EDUCATION_CATEGORY: &str = "27";
/// Freshly inserted videos reject thumbnails for a short while.
const THUMBNAIL_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    #[default]
    Unlisted,
    Private,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `tokens/token_<account>.json`
#[derive(Debug, Deserialize)]
struct TokenFile {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct InsertedVideo {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: String,
    description: String,
    tags: &'a [String],
    category_id: &'static str,
    default_language: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    privacy_status: Privacy,
    license: &'static str,
    self_declared_made_for_kids: bool,
}

#[derive(Debug, Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status,
}

pub struct UploadRequest<'a> {
    pub video: &'a Path,
    pub title: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub privacy: Privacy,
    pub account: &'a str,
    pub thumbnail: Option<&'a Path>,
    pub default_language: Language,
}

impl<'a> UploadRequest<'a> {
    fn resource(&self) -> VideoResource<'a> {
        VideoResource {
            snippet: Snippet {
                title: sanitize_with_fallback(self.title, "Auto Short #Shorts"),
                description: cap_description(self.description),
                tags: self.tags,
                category_id: EDUCATION_CATEGORY,
                default_language: self.default_language.code(),
            },
            status: Status {
                privacy_status: self.privacy,
                license: "youtube",
                self_declared_made_for_kids: false,
            },
        }
    }
}

fn cap_description(desc: &str) -> String {
    if desc.chars().count() > DESCRIPTION_MAX {
        let mut cut: String = desc.chars().take(DESCRIPTION_MAX - 3).collect();
        cut.push_str("...");
        cut
    } else {
        desc.to_string()
    }
}

fn image_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

pub struct YouTubeUploader {
    client: reqwest::Client,
    tokens_dir: PathBuf,
}

impl YouTubeUploader {
    pub fn new(tokens_dir: &Path) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            tokens_dir: tokens_dir.to_path_buf(),
        })
    }

    fn token_path(&self, account: &str) -> PathBuf {
        self.tokens_dir.join(format!("token_{}.json", account))
    }

    async fn access_token(&self, account: &str) -> Result<String> {
        let path = self.token_path(account);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            PipelineError::Upload(format!("cannot read token file {}: {}", path.display(), e))
        })?;
        let token: TokenFile = serde_json::from_str(&raw)?;

        let res = self
            .client
            .post(&token.token_uri)
            .form(&[
                ("client_id", token.client_id.as_str()),
                ("client_secret", token.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let res = check(res, "oauth").await?;
        Ok(res.json::<AccessToken>().await?.access_token)
    }

    /// Uploads the video and returns its `https://youtu.be/<id>` URL.
    pub async fn publish(&self, req: &UploadRequest<'_>) -> Result<String> {
        let access = self.access_token(req.account).await?;
        let bytes = tokio::fs::read(req.video).await?;

        let session = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&access)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", bytes.len().to_string())
            .json(&req.resource())
            .send()
            .await?;
        let session = check(session, "youtube").await?;
        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PipelineError::Upload("no resumable session URL returned".to_string()))?
            .to_string();

        let res = self
            .client
            .put(&location)
            .bearer_auth(&access)
            .header(CONTENT_TYPE, "video/mp4")
            .header(CONTENT_LENGTH, bytes.len())
            .body(bytes)
            .send()
            .await?;
        let video: InsertedVideo = check(res, "youtube").await?.json().await?;
        let url = format!("https://youtu.be/{}", video.id);
        info!("YouTube upload done: {} (account={})", url, req.account);

        if let Some(thumb) = req.thumbnail.filter(|p| p.exists()) {
            sleep(THUMBNAIL_DELAY).await;
            match self.set_thumbnail(&access, &video.id, thumb).await {
                Ok(()) => info!("Custom thumbnail set"),
                Err(e) => warn!("Thumbnail set failed: {}", e),
            }
        }
        Ok(url)
    }

    async fn set_thumbnail(&self, access: &str, video_id: &str, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let res = self
            .client
            .post(THUMBNAIL_URL)
            .query(&[("videoId", video_id)])
            .bearer_auth(access)
            .header(CONTENT_TYPE, image_content_type(path))
            .body(bytes)
            .send()
            .await?;
        check(res, "youtube thumbnails").await?;
        Ok(())
    }
}

async fn check(res: reqwest::Response, service: &str) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    Err(PipelineError::Api {
        service: service.to_string(),
        status: status.as_u16(),
        body: res.text().await.unwrap_or_default(),
    })
}

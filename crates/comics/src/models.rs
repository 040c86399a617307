//! Wire models for the Twirp JSON API and the chapter/page types handed to
//! the host.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SourceError;

static CHAPTER_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)mc(\d+)/(\d+)(?:[/?#]|$)").unwrap());

static COMIC_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"^(?:https?://[^/]+)?/?(?:detail/)?(?:mc)?(\d+)/?(?:[?#].*)?$").unwrap()
    });

/// `{code, msg, data}` wrapper used by every API response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default, alias = "message", deserialize_with = "null_as_empty")]
    pub msg: String,
    pub data: Option<T>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> Envelope<T> {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Unwrap the payload, turning a non-zero code or a missing body into an
    /// [`SourceError::Api`].
    pub fn into_data(self) -> Result<T, SourceError> {
        if self.code != 0 {
            return Err(SourceError::Api {
                code: self.code,
                message: self.msg,
            });
        }
        self.data.ok_or_else(|| SourceError::Api {
            code: self.code,
            message: "response has no data".to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComicDetail {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "ep_list")]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Episode {
    pub id: i64,
    #[serde(default)]
    pub ord: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pub_time: String,
    #[serde(default)]
    pub pay_mode: i32,
    #[serde(default)]
    pub pay_gold: i32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_in_free: bool,
}

impl Episode {
    /// Free episodes need no purchase or unlock.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.pay_mode == 0 && self.pay_gold == 0
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserEpisodes {
    #[serde(default, rename = "unlockedEpisodes", alias = "unlocked_eps")]
    pub unlocked_episodes: Option<Vec<UnlockedEpisode>>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockedEpisode {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialData {
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenData {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageIndex {
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ImageEntry {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageTokenEntry {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ComicIdPayload {
    pub comic_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenPayload<'a> {
    pub refresh_token: &'a str,
}

/// Body of the `GetCredential` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCredentialPayload {
    pub comic_id: i64,
    pub episode_id: i64,
    #[serde(rename = "type")]
    pub kind: i32,
}

#[derive(Debug, Serialize)]
pub struct ImageIndexPayload<'a> {
    pub ep_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ImageTokenPayload {
    /// JSON array of image paths, encoded as a string.
    pub urls: String,
}

/// Reference to a comic, e.g. `/detail/mc1234`, `mc1234` or `1234`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComicRef {
    pub comic_id: i64,
}

impl ComicRef {
    pub fn new(comic_id: i64) -> Self {
        Self { comic_id }
    }

    pub fn parse(input: &str) -> Result<Self, SourceError> {
        COMIC_URL_REGEX
            .captures(input.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .map(Self::new)
            .ok_or_else(|| SourceError::InvalidUrl(input.to_string()))
    }

    pub fn path(&self) -> String {
        format!("/detail/mc{}", self.comic_id)
    }
}

/// Reference to one episode of a comic, encoded as `/mc{comic}/{episode}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRef {
    pub comic_id: i64,
    pub episode_id: i64,
}

impl ChapterRef {
    pub fn new(comic_id: i64, episode_id: i64) -> Self {
        Self {
            comic_id,
            episode_id,
        }
    }

    pub fn parse(input: &str) -> Result<Self, SourceError> {
        let caps = CHAPTER_URL_REGEX
            .captures(input.trim())
            .ok_or_else(|| SourceError::InvalidUrl(input.to_string()))?;
        let comic_id = caps[1]
            .parse()
            .map_err(|_| SourceError::InvalidUrl(input.to_string()))?;
        let episode_id = caps[2]
            .parse()
            .map_err(|_| SourceError::InvalidUrl(input.to_string()))?;
        Ok(Self::new(comic_id, episode_id))
    }

    pub fn path(&self) -> String {
        format!("/mc{}/{}", self.comic_id, self.episode_id)
    }
}

impl From<GetCredentialPayload> for ChapterRef {
    fn from(payload: GetCredentialPayload) -> Self {
        Self::new(payload.comic_id, payload.episode_id)
    }
}

/// A chapter as presented to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub url: String,
    pub name: String,
    pub chapter_number: f64,
    /// Unix timestamp in seconds.
    pub date_upload: Option<i64>,
}

/// One page of a chapter. `image_url` is filled once the image token has been
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub index: usize,
    pub path: String,
    pub image_url: Option<String>,
}

//! Endpoint URLs and the default (anonymous) parsers for comic detail, image
//! index and image token responses.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use reqwest::Url;
use tracing::debug;

use crate::auth::Region;
use crate::error::SourceError;
use crate::http::ApiResponse;
use crate::models::{
    Chapter, ComicDetail, Envelope, Episode, ImageIndex, ImageTokenEntry, Page,
};

/// Registrable domain shared by the main site and the regional API hosts.
pub const SITE_DOMAIN: &str = "bilibilicomics.com";

const BASE_API_COMIC_ENDPOINT: &str = "twirp/comic.v1.Comic";
const GLOBAL_BASE_API_USER_ENDPOINT: &str = "twirp/global.v1.User";
const GLOBAL_BASE_API_COMIC_ENDPOINT: &str = "twirp/comic.v1.User";

/// Publication times are China Standard Time.
const PUB_TIME_OFFSET_SECS: i32 = 8 * 3600;

/// Check whether `url` points at the site or one of its API hosts.
pub fn is_site_url(url: &Url) -> bool {
    url.host_str().is_some_and(|host| {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == SITE_DOMAIN || host.ends_with(&format!(".{SITE_DOMAIN}"))
    })
}

/// Builds API URLs with the common query parameters attached.
#[derive(Debug, Clone)]
pub struct ApiUrls {
    base_url: Url,
    api_lang: &'static str,
}

impl ApiUrls {
    pub fn new(base_url: &str, api_lang: &'static str) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_lang,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Referer value for a site path such as `/mc1/2`.
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// `{base}/twirp/comic.v1.Comic/{method}`
    pub fn comic(&self, method: &str) -> Result<Url, SourceError> {
        let url = self
            .base_url
            .join(&format!("{BASE_API_COMIC_ENDPOINT}/{method}"))?;
        Ok(self.with_common_params(url))
    }

    /// `https://{region}.bilibilicomics.com/twirp/global.v1.User/{method}`
    pub fn global_user(&self, region: Region, method: &str) -> Result<Url, SourceError> {
        self.regional(region, GLOBAL_BASE_API_USER_ENDPOINT, method)
    }

    /// `https://{region}.bilibilicomics.com/twirp/comic.v1.User/{method}`
    pub fn global_comic(&self, region: Region, method: &str) -> Result<Url, SourceError> {
        self.regional(region, GLOBAL_BASE_API_COMIC_ENDPOINT, method)
    }

    fn regional(&self, region: Region, service: &str, method: &str) -> Result<Url, SourceError> {
        let url = Url::parse(&format!(
            "https://{}.{SITE_DOMAIN}/{service}/{method}",
            region.api_subdomain()
        ))?;
        Ok(self.with_common_params(url))
    }

    fn with_common_params(&self, mut url: Url) -> Url {
        url.query_pairs_mut()
            .append_pair("device", "pc")
            .append_pair("platform", "web")
            .append_pair("lang", self.api_lang)
            .append_pair("sys_lang", self.api_lang);
        url
    }
}

/// Parse a `ComicDetail` response. `Ok(None)` when the API reports a
/// non-zero code.
pub fn parse_comic_detail(response: ApiResponse) -> Result<Option<ComicDetail>, SourceError> {
    let envelope: Envelope<ComicDetail> = response.error_for_status()?.json()?;
    if !envelope.is_ok() {
        debug!(code = envelope.code, msg = %envelope.msg, "Comic detail not available");
        return Ok(None);
    }
    Ok(envelope.data)
}

/// Default page-list parser for a `GetImageIndex` response.
pub fn parse_image_index(response: ApiResponse) -> Result<Vec<Page>, SourceError> {
    let index: ImageIndex = response.error_for_status()?.json::<Envelope<_>>()?.into_data()?;
    Ok(index
        .images
        .into_iter()
        .enumerate()
        .map(|(index, image)| Page {
            index,
            path: image.path,
            image_url: None,
        })
        .collect())
}

/// Parse an `ImageToken` response into signed image URLs, in request order.
pub fn parse_image_token(response: ApiResponse) -> Result<Vec<String>, SourceError> {
    let entries: Vec<ImageTokenEntry> =
        response.error_for_status()?.json::<Envelope<_>>()?.into_data()?;
    Ok(entries
        .into_iter()
        .map(|entry| format!("{}?token={}", entry.url, entry.token))
        .collect())
}

pub fn episode_to_chapter(episode: &Episode, comic_id: i64) -> Chapter {
    let ord = format_ord(episode.ord);
    let title = episode.title.trim();
    let name = if title.is_empty() {
        format!("Ep. {ord}")
    } else {
        format!("Ep. {ord} - {title}")
    };

    Chapter {
        url: format!("/mc{comic_id}/{}", episode.id),
        name,
        chapter_number: episode.ord,
        date_upload: parse_pub_time(&episode.pub_time),
    }
}

fn format_ord(ord: f64) -> String {
    if ord.fract() == 0.0 {
        format!("{}", ord as i64)
    } else {
        ord.to_string()
    }
}

fn parse_pub_time(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.timestamp());
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok()?;
    FixedOffset::east_opt(PUB_TIME_OFFSET_SECS)?
        .from_local_datetime(&naive)
        .single()
        .map(|date| date.timestamp())
}

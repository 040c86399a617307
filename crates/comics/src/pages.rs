//! Page listing. Signed-in users first exchange their session for a
//! per-chapter credential, which then authorizes the image index request.

use tracing::{debug, instrument, warn};

use crate::api::parse_image_index;
use crate::client::BilibiliComics;
use crate::error::SourceError;
use crate::http::{ApiResponse, post_json};
use crate::models::{
    ChapterRef, CredentialData, Envelope, GetCredentialPayload, ImageIndexPayload, Page,
};

/// `type` value of a chapter-read credential request.
const CREDENTIAL_KIND_READ: i32 = 1;

/// Short-lived token authorizing the image index of one chapter.
#[derive(Clone, PartialEq, Eq)]
pub struct PageCredential {
    pub chapter: ChapterRef,
    /// May be empty when the API granted no credential.
    pub token: String,
}

impl std::fmt::Debug for PageCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCredential")
            .field("chapter", &self.chapter)
            .field("token_len", &self.token.len())
            .finish()
    }
}

pub fn credential_payload(chapter: &ChapterRef) -> GetCredentialPayload {
    GetCredentialPayload {
        comic_id: chapter.comic_id,
        episode_id: chapter.episode_id,
        kind: CREDENTIAL_KIND_READ,
    }
}

/// Parse a `GetCredential` response for `chapter`.
pub fn parse_page_credential(
    response: &ApiResponse,
    chapter: ChapterRef,
) -> Result<PageCredential, SourceError> {
    if !response.is_success() {
        warn!(status = %response.status, chapter = %chapter.path(), "Credential request rejected");
        return Err(SourceError::credential_fetch_failed());
    }

    let envelope: Envelope<CredentialData> = response.json()?;
    if !envelope.is_ok() {
        debug!(code = envelope.code, msg = %envelope.msg, "Credential response has non-zero code");
    }
    let token = envelope
        .data
        .and_then(|data| data.credential)
        .unwrap_or_default();

    Ok(PageCredential { chapter, token })
}

impl BilibiliComics {
    /// Exchange the signed-in session for a credential to read `chapter`.
    #[instrument(skip(self), fields(chapter = %chapter.path()))]
    pub async fn exchange_page_credential(
        &self,
        chapter: &ChapterRef,
    ) -> Result<PageCredential, SourceError> {
        let url = self
            .urls()
            .global_user(self.session().region(), "GetCredential")?;
        let payload = credential_payload(chapter);
        let request = post_json(url, &self.urls().page_url(&chapter.path()), &payload)?;

        let response = match self.pipeline().execute(request).await {
            Ok(response) => response,
            Err(e) if e.requires_relogin() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Credential request failed");
                return Err(SourceError::credential_fetch_failed());
            }
        };

        parse_page_credential(&response, ChapterRef::from(payload))
    }

    /// `GetImageIndex` for `chapter`, with `credential` when signed in.
    pub(crate) async fn image_index(
        &self,
        chapter: &ChapterRef,
        credential: Option<&str>,
    ) -> Result<Vec<Page>, SourceError> {
        let url = self.urls().comic("GetImageIndex")?;
        let payload = ImageIndexPayload {
            ep_id: chapter.episode_id,
            credential,
        };
        let request = post_json(url, &self.urls().page_url(&chapter.path()), &payload)?;
        let response = self.pipeline().execute(request).await?;
        parse_image_index(response)
    }

    pub(crate) async fn signed_in_page_list(
        &self,
        chapter: &ChapterRef,
    ) -> Result<Vec<Page>, SourceError> {
        let credential = self.exchange_page_credential(chapter).await?;
        self.image_index(&credential.chapter, Some(&credential.token))
            .await
    }
}

//! Which episodes a signed-in user may read.

use rustc_hash::FxHashSet;
use tracing::{debug, instrument, warn};

use crate::client::BilibiliComics;
use crate::error::SourceError;
use crate::http::{ApiResponse, post_json};
use crate::models::{ComicIdPayload, Envelope, Episode, UserEpisodes};

/// Keep the episodes that are free or unlocked, in their original order.
pub fn accessible_episodes<'a>(
    episodes: &'a [Episode],
    unlocked: &FxHashSet<i64>,
) -> Vec<&'a Episode> {
    episodes
        .iter()
        .filter(|episode| episode.is_free() || unlocked.contains(&episode.id))
        .collect()
}

/// Parse a `GetUserEpisodes` response. Any problem yields an empty set.
pub fn parse_unlocked_episodes(response: &ApiResponse) -> FxHashSet<i64> {
    if !response.is_success() {
        warn!(status = %response.status, "Unlocked episode lookup failed");
        return FxHashSet::default();
    }

    let envelope: Envelope<UserEpisodes> = match response.json() {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Unlocked episode response is malformed");
            return FxHashSet::default();
        }
    };
    if !envelope.is_ok() {
        warn!(code = envelope.code, msg = %envelope.msg, "Unlocked episode lookup rejected");
        return FxHashSet::default();
    }

    envelope
        .data
        .and_then(|data| data.unlocked_episodes)
        .unwrap_or_default()
        .into_iter()
        .map(|episode| episode.id)
        .collect()
}

impl BilibiliComics {
    /// Episode ids the signed-in user has unlocked for `comic_id`.
    ///
    /// Fails open: only a failed token refresh is reported, everything else
    /// degrades to "nothing unlocked".
    #[instrument(skip(self))]
    pub(crate) async fn unlocked_episodes(
        &self,
        comic_id: i64,
    ) -> Result<FxHashSet<i64>, SourceError> {
        let response = match self.request_unlocked_episodes(comic_id).await {
            Ok(response) => response,
            Err(e) if e.requires_relogin() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Unlocked episode lookup failed");
                return Ok(FxHashSet::default());
            }
        };

        let unlocked = parse_unlocked_episodes(&response);
        debug!(count = unlocked.len(), "Unlocked episodes");
        Ok(unlocked)
    }

    async fn request_unlocked_episodes(&self, comic_id: i64) -> Result<ApiResponse, SourceError> {
        let url = self
            .urls()
            .global_comic(self.session().region(), "GetUserEpisodes")?;
        let request = post_json(
            url,
            self.urls().base_url().as_str(),
            &ComicIdPayload { comic_id },
        )?;
        self.pipeline().execute(request).await
    }
}

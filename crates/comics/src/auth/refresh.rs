use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::Request;
use tracing::{info, warn};

use super::credential::SessionCredential;
use crate::api::ApiUrls;
use crate::error::SourceError;
use crate::http::{ApiResponse, Next, post_json};
use crate::models::{AccessTokenData, Envelope, RefreshTokenPayload};

/// Exchanges a refresh token for a new token pair.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    urls: ApiUrls,
}

impl TokenRefresher {
    pub fn new(urls: ApiUrls) -> Self {
        Self { urls }
    }

    /// Build the `RefreshToken` request for `credential`'s region.
    pub fn request(&self, credential: &SessionCredential) -> Result<Request, SourceError> {
        let url = self.urls.global_user(credential.region, "RefreshToken")?;
        let payload = RefreshTokenPayload {
            refresh_token: &credential.refresh_token,
        };
        let mut request = post_json(url, self.urls.base_url().as_str(), &payload)?;
        set_bearer(&mut request, &credential.access_token);
        Ok(request)
    }

    /// Parse a `RefreshToken` response. The region is carried over from
    /// `previous`. Any failure maps to [`SourceError::RefreshFailed`].
    pub fn parse(
        &self,
        response: &ApiResponse,
        previous: &SessionCredential,
    ) -> Result<SessionCredential, SourceError> {
        if !response.is_success() {
            warn!(status = %response.status, "Token refresh rejected");
            return Err(SourceError::refresh_failed());
        }

        let envelope: Envelope<AccessTokenData> = response.json().map_err(|e| {
            warn!(error = %e, "Token refresh response is malformed");
            SourceError::refresh_failed()
        })?;
        let data = envelope.into_data().map_err(|e| {
            warn!(error = %e, "Token refresh failed");
            SourceError::refresh_failed()
        })?;
        if data.access_token.is_empty() {
            warn!("Token refresh returned an empty access token");
            return Err(SourceError::refresh_failed());
        }

        Ok(SessionCredential::new(
            data.access_token,
            data.refresh_token,
            previous.region,
        ))
    }

    /// Send the refresh through the rest of the pipeline and parse the result.
    pub async fn refresh(
        &self,
        credential: &SessionCredential,
        next: Next<'_>,
    ) -> Result<SessionCredential, SourceError> {
        let request = self.request(credential)?;
        let response = next.run(request).await.map_err(|e| {
            warn!(error = %e, "Token refresh request failed");
            SourceError::refresh_failed()
        })?;
        let refreshed = self.parse(&response, credential)?;
        info!(region = %refreshed.region, "Access token refreshed");
        Ok(refreshed)
    }
}

/// Set (replacing any previous value) `Authorization: Bearer <token>`.
pub(crate) fn set_bearer(request: &mut Request, token: &str) {
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(_) => {
            warn!("Access token is not a valid header value; sending without it");
            request.headers_mut().remove(AUTHORIZATION);
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, StatusCode};
use tracing::{debug, warn};

use super::credential::SessionCredential;
use super::refresh::{TokenRefresher, set_bearer};
use super::session::Session;
use crate::api::is_site_url;
use crate::error::SourceError;
use crate::http::{ApiResponse, Middleware, Next};

/// Attaches the session's bearer token to site requests and, on a `401`,
/// refreshes the token and retries the request once.
///
/// Refreshes are single-flight: concurrent `401`s produce one `RefreshToken`
/// call and the waiters reuse its result.
pub struct AuthMiddleware {
    session: Arc<Session>,
    refresher: TokenRefresher,
}

impl AuthMiddleware {
    pub fn new(session: Arc<Session>, refresher: TokenRefresher) -> Self {
        Self { session, refresher }
    }

    async fn refresh(
        &self,
        stale: &SessionCredential,
        next: Next<'_>,
    ) -> Result<SessionCredential, SourceError> {
        let mut state = self.session.refresh_lock().lock().await;

        // Another request may have refreshed while we waited.
        if let Some(current) = self.session.current()
            && current.has_access_token()
            && current.access_token != stale.access_token
        {
            debug!("Using token refreshed by a concurrent request");
            return Ok(current);
        }

        if state.failed_token.as_deref() == Some(stale.access_token.as_str()) {
            debug!("Refresh already failed for this token");
            return Err(SourceError::refresh_failed());
        }

        match self.refresher.refresh(stale, next).await {
            Ok(fresh) => {
                state.failed_token = None;
                self.session.replace(fresh.clone());
                Ok(fresh)
            }
            Err(e) => {
                if e.requires_relogin() {
                    state.failed_token = Some(stale.access_token.clone());
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<ApiResponse, SourceError> {
        if !is_site_url(request.url()) {
            return next.run(request).await;
        }

        let credential = self.session.sync(request.url());
        if let Some(credential) = credential.as_ref().filter(|c| c.has_access_token()) {
            set_bearer(&mut request, &credential.access_token);
        }

        let retry = request.try_clone();
        let response = next.run(request).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(stale) = credential.filter(|c| c.has_refresh_token()) else {
            return Ok(response);
        };
        let Some(mut retry) = retry else {
            warn!(url = %response.url, "Request body cannot be replayed; not refreshing");
            return Ok(response);
        };

        debug!(url = %response.url, "Access token rejected; refreshing");
        let fresh = self.refresh(&stale, next).await?;
        set_bearer(&mut retry, &fresh.access_token);
        next.run(retry).await
    }
}

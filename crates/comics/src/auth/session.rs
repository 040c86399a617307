use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;
use tracing::{debug, info};

use super::cookie::{ACCESS_TOKEN_COOKIE_NAME, CookieSource};
use super::credential::{Region, SessionCredential};
use super::store::SessionStore;

/// Keeps the [`SessionStore`] in step with the cookie jar.
///
/// The cookie is the source of truth: whenever its raw value changes
/// (sign-in, account switch, sign-out) the stored credential is replaced or
/// cleared. While the cookie is unchanged the stored credential wins, so
/// tokens obtained by a refresh survive until the cookie itself changes.
pub struct Session {
    cookies: Arc<dyn CookieSource>,
    store: Arc<dyn SessionStore>,
    observed_cookie: Mutex<Option<String>>,
    refresh_lock: tokio::sync::Mutex<RefreshState>,
}

/// State guarded by the refresh lock.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
    /// Access token whose refresh was rejected. Requests still holding it
    /// fail without asking again.
    pub(crate) failed_token: Option<String>,
}

impl Session {
    pub fn new(cookies: Arc<dyn CookieSource>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            cookies,
            store,
            observed_cookie: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(RefreshState::default()),
        }
    }

    /// Re-read the session cookie for `url` and return the current credential.
    pub fn sync(&self, url: &Url) -> Option<SessionCredential> {
        let raw = self.cookies.cookie(url, ACCESS_TOKEN_COOKIE_NAME);

        let mut observed = self.observed_cookie.lock();
        if *observed != raw {
            let credential = raw.as_deref().and_then(SessionCredential::from_cookie_value);
            match &credential {
                Some(c) => info!(region = %c.region, "Session cookie changed; using new credential"),
                None if raw.is_some() => debug!("Session cookie unreadable; treating as signed out"),
                None => info!("Session cookie removed; signed out"),
            }
            self.store.save(credential);
            *observed = raw;
        }
        drop(observed);

        self.store.load()
    }

    pub fn current(&self) -> Option<SessionCredential> {
        self.store.load()
    }

    /// Signed in means a credential with a non-empty access token.
    pub fn is_signed_in(&self) -> bool {
        self.current().is_some_and(|c| c.has_access_token())
    }

    pub fn region(&self) -> Region {
        self.current().map(|c| c.region).unwrap_or_default()
    }

    pub(crate) fn replace(&self, credential: SessionCredential) {
        self.store.save(Some(credential));
    }

    /// Serializes token refreshes.
    pub(crate) fn refresh_lock(&self) -> &tokio::sync::Mutex<RefreshState> {
        &self.refresh_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;
    use reqwest::cookie::Jar;

    fn site() -> Url {
        Url::parse("https://www.bilibilicomics.com/").unwrap()
    }

    fn set_cookie(jar: &Jar, credential: &SessionCredential) {
        jar.add_cookie_str(
            &format!("access_token={}; Path=/", credential.to_cookie_value()),
            &site(),
        );
    }

    fn session(jar: Arc<Jar>) -> Session {
        Session::new(jar, Arc::new(MemorySessionStore::new()))
    }

    #[test]
    fn test_no_cookie_is_signed_out() {
        let session = session(Arc::new(Jar::default()));
        assert_eq!(session.sync(&site()), None);
        assert!(!session.is_signed_in());
        assert_eq!(session.region(), Region::Us);
    }

    #[test]
    fn test_cookie_sign_in_and_sign_out() {
        let jar = Arc::new(Jar::default());
        let session = session(jar.clone());
        let credential = SessionCredential::new("at", "rt", Region::Sg);
        set_cookie(&jar, &credential);

        assert_eq!(session.sync(&site()), Some(credential));
        assert!(session.is_signed_in());
        assert_eq!(session.region(), Region::Sg);

        // Expired cookie removes it from the jar.
        jar.add_cookie_str(
            "access_token=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            &site(),
        );
        assert_eq!(session.sync(&site()), None);
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_refreshed_credential_survives_unchanged_cookie() {
        let jar = Arc::new(Jar::default());
        let session = session(jar.clone());
        set_cookie(&jar, &SessionCredential::new("old", "rt", Region::Us));
        session.sync(&site());

        let refreshed = SessionCredential::new("new", "rt2", Region::Us);
        session.replace(refreshed.clone());
        assert_eq!(session.sync(&site()), Some(refreshed));

        let switched = SessionCredential::new("other", "rt3", Region::Sg);
        set_cookie(&jar, &switched);
        assert_eq!(session.sync(&site()), Some(switched));
    }

    #[test]
    fn test_empty_access_token_is_not_signed_in() {
        let jar = Arc::new(Jar::default());
        let session = session(jar.clone());
        set_cookie(&jar, &SessionCredential::new("", "rt", Region::Us));

        assert!(session.sync(&site()).is_some());
        assert!(!session.is_signed_in());
    }
}

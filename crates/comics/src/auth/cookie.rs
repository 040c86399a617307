use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};

/// Name of the cookie holding the signed-in session.
pub const ACCESS_TOKEN_COOKIE_NAME: &str = "access_token";

/// Read access to the cookies the host keeps for the site.
pub trait CookieSource: Send + Sync {
    /// Raw (still percent-encoded) value of cookie `name` as it would be sent to `url`.
    fn cookie(&self, url: &Url, name: &str) -> Option<String>;
}

impl CookieSource for Jar {
    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.cookies(url)?;
        extract_cookie_value(header.to_str().ok()?, name)
    }
}

/// Extract a specific cookie value from a `Cookie` header string.
///
/// # Example
/// ```
/// use comics_source::auth::extract_cookie_value;
///
/// let cookies = "buvid=abc123; access_token=xyz789";
/// assert_eq!(extract_cookie_value(cookies, "access_token"), Some("xyz789".to_string()));
/// ```
pub fn extract_cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

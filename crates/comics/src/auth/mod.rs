//! Signed-in session handling.
//!
//! - [`SessionCredential`]: token pair + region decoded from the `access_token` cookie
//! - [`SessionStore`]: injectable holder of the current credential
//! - [`Session`]: keeps the store in step with the cookie jar
//! - [`TokenRefresher`]: the `RefreshToken` call
//! - [`AuthMiddleware`]: pipeline stage attaching the bearer token and
//!   refreshing it on 401

mod cookie;
mod credential;
mod middleware;
mod refresh;
mod session;
mod store;

pub use cookie::{ACCESS_TOKEN_COOKIE_NAME, CookieSource, extract_cookie_value};
pub use credential::{Region, SessionCredential};
pub use middleware::AuthMiddleware;
pub use refresh::TokenRefresher;
pub use session::Session;
pub use store::{MemorySessionStore, SessionStore};

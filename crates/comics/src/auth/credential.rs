use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Deployment partition serving a signed-in user's API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// Area code `1`, also the fallback for a missing or unknown code.
    #[default]
    Us,
    /// Area code `2`.
    Sg,
}

impl Region {
    /// Map the cookie's `area` field (string or number) to a region.
    pub fn from_area(area: Option<&Value>) -> Self {
        let code = match area {
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(Value::Number(n)) => n.as_i64(),
            _ => None,
        };
        match code {
            Some(2) => Region::Sg,
            _ => Region::Us,
        }
    }

    pub fn area_code(self) -> &'static str {
        match self {
            Region::Us => "1",
            Region::Sg => "2",
        }
    }

    pub fn api_subdomain(self) -> &'static str {
        match self {
            Region::Us => "us-user",
            Region::Sg => "sg-user",
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_subdomain())
    }
}

/// Cookie payload, `{accessToken, refreshToken, area}` as JSON.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenCookie {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<Value>,
}

/// Access/refresh token pair of a signed-in session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub region: Region,
}

impl SessionCredential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        region: Region,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            region,
        }
    }

    /// Decode the raw `access_token` cookie value.
    ///
    /// Returns `None` on any decoding problem: a broken cookie means "signed
    /// out", never an error.
    pub fn from_cookie_value(raw: &str) -> Option<Self> {
        let decoded = match urlencoding::decode(raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(error = %e, "Session cookie is not valid percent-encoding");
                return None;
            }
        };

        let cookie: AccessTokenCookie = match serde_json::from_str(&decoded) {
            Ok(cookie) => cookie,
            Err(e) => {
                debug!(error = %e, "Session cookie is not valid JSON");
                return None;
            }
        };

        Some(Self {
            access_token: cookie.access_token,
            refresh_token: cookie.refresh_token,
            region: Region::from_area(cookie.area.as_ref()),
        })
    }

    /// Encode back into the cookie format.
    pub fn to_cookie_value(&self) -> String {
        let cookie = AccessTokenCookie {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            area: Some(Value::String(self.region.area_code().to_string())),
        };
        // Serializing strings into a JSON object cannot fail.
        let json = serde_json::to_string(&cookie).unwrap_or_default();
        urlencoding::encode(&json).into_owned()
    }

    #[inline]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    #[inline]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("region", &self.region)
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() { "<empty>" } else { "<redacted>" }
}

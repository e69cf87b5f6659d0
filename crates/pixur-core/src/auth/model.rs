use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a signed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    #[default]
    Unknown,
    Refresh,
    Auth,
    Pix,
}

/// Readable payload of a server-signed token.
///
/// The client never verifies signatures; it only reads expiry and subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PwtPayload {
    /// Varint-encoded user id.
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_not_after: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::wire::int64")]
    pub token_id: i64,
    #[serde(default, with = "crate::wire::int64")]
    pub token_parent_id: i64,
    #[serde(rename = "type", default)]
    pub token_type: TokenType,
}

impl PwtPayload {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.not_after
    }
}

/// A raw token and the payload it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub payload: PwtPayload,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, payload: PwtPayload) -> Self {
        Self {
            token: token.into(),
            payload,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.payload.is_expired_at(now)
    }
}

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side user id (varint), taken from the token subject.
    pub subject: String,
    /// Login name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
}

/// Everything the client persists between runs.
///
/// Absence of `ident`, `refresh` and `auth` means unauthenticated. The XSRF
/// token is kept separately and survives logout, like the cookie it mirrors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<AuthToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xsrf: Option<String>,
}

impl SessionData {
    /// Drops identity and token material, keeping the XSRF token.
    pub fn clear_credentials(&mut self) {
        self.ident = None;
        self.refresh = None;
        self.auth = None;
    }

    pub fn has_credentials(&self) -> bool {
        self.ident.is_some() || self.refresh.is_some() || self.auth.is_some()
    }

    /// Returns the auth token if it has not expired at `now`.
    pub fn fresh_auth(&self, now: DateTime<Utc>) -> Option<&AuthToken> {
        self.auth.as_ref().filter(|auth| !auth.is_expired_at(now))
    }
}

/// Where the credential lifecycle currently stands.
///
/// ```text
/// Unauthenticated -> TokenRequested -> Authenticated
///                                        |  ^
///                                        v  |
///                                 Expired -> Refreshing
/// ```
/// Logging out returns to `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    TokenRequested,
    Authenticated,
    Expired,
    Refreshing,
}

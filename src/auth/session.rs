//! Signed-cookie sessions.
//!
//! The whole session lives in the cookie: a base64url JSON payload followed
//! by a base64url HMAC-SHA256 tag, `payload.tag`. Nothing is kept on the
//! server, so a cookie that fails the tag check is simply dropped and the
//! request continues as anonymous.

use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, warn};

use crate::config::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

/// Oldest flashes are dropped past this so the cookie stays well under 4 KB.
pub const MAX_FLASHES: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session cookie is not in payload.tag form")]
    Malformed,
    #[error("session cookie signature mismatch")]
    BadSignature,
    #[error("session payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("session payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
    Warning,
    Info,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<Flash>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self.username.is_none() && self.flashes.is_empty()
    }
}

/// Signing key plus cookie attributes.
#[derive(Clone)]
pub struct SessionKeys {
    key: Arc<[u8]>,
    cookie_name: Arc<str>,
    secure: bool,
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            key: config.secret_key.as_bytes().into(),
            cookie_name: config.cookie_name.as_str().into(),
            secure: config.cookie_secure,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    pub fn sign(&self, data: &SessionData) -> Result<String, SessionError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(data)?);
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{tag}"))
    }

    pub fn unsign(&self, value: &str) -> Result<SessionData, SessionError> {
        let (payload, tag) = value.rsplit_once('.').ok_or(SessionError::Malformed)?;
        let tag = URL_SAFE_NO_PAD.decode(tag)?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| SessionError::BadSignature)?;

        let json = URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.to_string(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    fn set_cookie(&self, value: String) -> String {
        self.cookie(value).to_string()
    }

    fn removal_cookie(&self) -> String {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();
        cookie.to_string()
    }
}

/// Per-request session. Extract it, mutate it, and return it as part of
/// the response so changes are written back as a `Set-Cookie` header.
pub struct Session {
    data: SessionData,
    keys: SessionKeys,
    had_cookie: bool,
    dirty: bool,
}

impl Session {
    pub fn new(keys: SessionKeys) -> Self {
        Self {
            data: SessionData::default(),
            keys,
            had_cookie: false,
            dirty: false,
        }
    }

    /// Rebuilds a session from a raw `Cookie` header value.
    pub fn from_cookie_header(keys: SessionKeys, header: &str) -> Self {
        let Some(raw) = find_cookie(header, keys.cookie_name()) else {
            return Self::new(keys);
        };

        match keys.unsign(&raw) {
            Ok(data) => Self {
                data,
                keys,
                had_cookie: true,
                dirty: false,
            },
            Err(e) => {
                warn!(error = %e, "discarding invalid session cookie");
                // overwrite the bad cookie on the way out
                Self {
                    data: SessionData::default(),
                    keys,
                    had_cookie: true,
                    dirty: true,
                }
            }
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.data.username.as_deref()
    }

    pub fn login(&mut self, username: impl Into<String>) {
        self.data.username = Some(username.into());
        self.dirty = true;
    }

    pub fn logout(&mut self) {
        if self.data.username.take().is_some() {
            self.dirty = true;
        }
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        let flashes = &mut self.data.flashes;
        flashes.push(Flash {
            category,
            message: message.into(),
        });
        if flashes.len() > MAX_FLASHES {
            flashes.drain(..flashes.len() - MAX_FLASHES);
        }
        self.dirty = true;
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        if self.data.flashes.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.data.flashes)
    }

    fn set_cookie_header(&self) -> Option<HeaderValue> {
        if !self.dirty {
            return None;
        }

        let cookie = if self.data.is_empty() {
            if !self.had_cookie {
                return None;
            }
            self.keys.removal_cookie()
        } else {
            match self.keys.sign(&self.data) {
                Ok(value) => self.keys.set_cookie(value),
                Err(e) => {
                    error!(error = %e, "failed to sign session");
                    return None;
                }
            }
        };

        match HeaderValue::from_str(&cookie) {
            Ok(v) => Some(v),
            Err(e) => {
                error!(error = %e, "session cookie is not a valid header value");
                None
            }
        }
    }
}

fn find_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .flatten()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let cookie_name = keys.cookie_name().to_string();

        // browsers may split cookies over several headers
        let raw = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| find_cookie(v, &cookie_name).is_some());

        Ok(match raw {
            Some(h) => Session::from_cookie_header(keys, h),
            None => Session::new(keys),
        })
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(cookie) = self.set_cookie_header() {
            res.headers_mut().append(header::SET_COOKIE, cookie);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> SessionKeys {
        SessionKeys::new(&SessionConfig {
            secret_key: secret.into(),
            cookie_name: "sid".into(),
            cookie_secure: false,
        })
    }

    fn cookie_value(session: &Session) -> String {
        let header = session.set_cookie_header().expect("cookie written");
        let header = header.to_str().unwrap();
        let (pair, _) = header.split_once(';').unwrap();
        pair.trim_start_matches("sid=").to_string()
    }

    #[test]
    fn signed_session_survives_a_roundtrip() {
        let mut session = Session::new(keys("k"));
        session.login("alice");
        session.flash(FlashCategory::Success, "hi");

        let value = cookie_value(&session);
        let restored = Session::from_cookie_header(keys("k"), &format!("other=1; sid={value}"));
        assert_eq!(restored.username(), Some("alice"));
        assert_eq!(restored.data.flashes.len(), 1);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let k = keys("k");
        let mut data = SessionData::default();
        data.username = Some("alice".into());
        let signed = k.sign(&data).unwrap();
        let (_, tag) = signed.split_once('.').unwrap();

        let forged = URL_SAFE_NO_PAD.encode(br#"{"username":"admin"}"#);
        let err = k.unsign(&format!("{forged}.{tag}")).unwrap_err();
        assert!(matches!(err, SessionError::BadSignature));
    }

    #[test]
    fn cookie_signed_with_another_key_is_anonymous() {
        let mut session = Session::new(keys("first"));
        session.login("alice");
        let value = cookie_value(&session);

        let restored = Session::from_cookie_header(keys("second"), &format!("sid={value}"));
        assert!(restored.username().is_none());
        // the stale cookie gets cleared
        let header = restored.set_cookie_header().unwrap();
        assert!(header.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn untouched_session_writes_nothing() {
        let session = Session::new(keys("k"));
        assert!(session.set_cookie_header().is_none());
    }

    #[test]
    fn logout_clears_the_cookie() {
        let mut session = Session::new(keys("k"));
        session.login("alice");
        let value = cookie_value(&session);

        let mut restored = Session::from_cookie_header(keys("k"), &format!("sid={value}"));
        restored.logout();
        let header = restored.set_cookie_header().unwrap();
        assert!(header.to_str().unwrap().starts_with("sid=;"));
    }

    #[test]
    fn flashes_are_consumed_once() {
        let mut session = Session::new(keys("k"));
        session.flash(FlashCategory::Danger, "bad");
        let flashes = session.take_flashes();
        assert_eq!(flashes[0].category, FlashCategory::Danger);
        assert!(session.take_flashes().is_empty());
    }

    #[test]
    fn secure_flag_is_added_when_configured() {
        let k = SessionKeys::new(&SessionConfig {
            secret_key: "k".into(),
            cookie_name: "sid".into(),
            cookie_secure: true,
        });
        let mut session = Session::new(k);
        session.login("alice");
        let header = session.set_cookie_header().unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("; Secure"));
    }

    #[test]
    fn insecure_cookie_has_no_secure_flag() {
        let mut session = Session::new(keys("k"));
        session.login("alice");
        let header = session.set_cookie_header().unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("Path=/"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn malformed_cookie_pairs_are_skipped() {
        let mut session = Session::new(keys("k"));
        session.login("alice");
        let value = cookie_value(&session);

        let header = format!("garbage; =nameless; sid={value}");
        let restored = Session::from_cookie_header(keys("k"), &header);
        assert_eq!(restored.username(), Some("alice"));
    }

    #[test]
    fn flash_queue_keeps_only_the_newest() {
        let mut session = Session::new(keys("k"));
        for i in 0..50 {
            session.flash(FlashCategory::Info, format!("message {i} {}", "x".repeat(200)));
        }
        assert_eq!(session.data.flashes.len(), MAX_FLASHES);
        assert!(session.data.flashes[MAX_FLASHES - 1].message.starts_with("message 49 "));
        assert!(session.data.flashes[0].message.starts_with("message 42 "));

        let header = session.set_cookie_header().unwrap();
        assert!(header.len() < 4096);
    }
}

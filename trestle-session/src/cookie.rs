//! Signed, timestamped session cookies.
//!
//! A cookie value has three `|`-separated parts:
//!
//! ```text
//! base64url(payload) | unix timestamp | base64url(HMAC-SHA256(name|payload|timestamp))
//! ```
//!
//! The cookie name is covered by the signature, so a value issued for one
//! session name is rejected under another.

use crate::codec::{self, SessionData};
use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;
use trestle_core::{HttpRequest, HttpResponse};
use trestle_log::debug;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock skew for timestamps issued "in the future", in seconds.
const CLOCK_SKEW: i64 = 60;

/// Reasons a cookie value is not accepted.
///
/// These never leave the session layer: a rejected cookie is treated as
/// no cookie at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("malformed cookie value")]
    Malformed,

    #[error("cookie signature mismatch")]
    BadSignature,

    #[error("cookie timestamp outside the accepted window")]
    Expired,

    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u64),

    #[error("invalid signing key")]
    InvalidKey,
}

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct SecureCookieSerializer {
    secret: Vec<u8>,
}

impl SecureCookieSerializer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign `data` for the cookie `name` using the current time.
    pub fn serialize(&self, name: &str, data: &SessionData) -> SessionResult<String> {
        self.serialize_at(name, data, chrono::Utc::now().timestamp())
    }

    pub fn serialize_at(
        &self,
        name: &str,
        data: &SessionData,
        timestamp: i64,
    ) -> SessionResult<String> {
        let payload = URL_SAFE_NO_PAD.encode(codec::encode(data)?);
        let timestamp = timestamp.to_string();
        let signature = self
            .signature(name, &payload, &timestamp)
            .map_err(|e| SessionError::Other(e.to_string()))?
            .finalize()
            .into_bytes();

        Ok(format!(
            "{}|{}|{}",
            payload,
            timestamp,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify and decode a cookie value. `max_age` bounds the age of the
    /// signature in seconds.
    pub fn deserialize(
        &self,
        name: &str,
        value: &str,
        max_age: Option<i64>,
    ) -> Result<SessionData, CookieError> {
        self.deserialize_at(name, value, max_age, chrono::Utc::now().timestamp())
    }

    pub fn deserialize_at(
        &self,
        name: &str,
        value: &str,
        max_age: Option<i64>,
        now: i64,
    ) -> Result<SessionData, CookieError> {
        let mut parts = value.split('|');
        let (Some(payload), Some(timestamp), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CookieError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CookieError::Malformed)?;
        self.signature(name, payload, timestamp)?
            .verify_slice(&signature)
            .map_err(|_| CookieError::BadSignature)?;

        let issued: i64 = timestamp.parse().map_err(|_| CookieError::Malformed)?;
        if issued > now + CLOCK_SKEW {
            return Err(CookieError::Expired);
        }
        if let Some(max_age) = max_age {
            if issued < now - max_age {
                return Err(CookieError::Expired);
            }
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(CookieError::Malformed)?;

        codec::decode(&json).map_err(|e| match e {
            SessionError::UnsupportedVersion(version) => CookieError::UnsupportedVersion(version),
            _ => CookieError::Malformed,
        })
    }

    fn signature(&self, name: &str, payload: &str, timestamp: &str) -> Result<HmacSha256, CookieError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| CookieError::InvalidKey)?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        mac.update(b"|");
        mac.update(timestamp.as_bytes());
        Ok(mac)
    }
}

impl std::fmt::Debug for SecureCookieSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureCookieSerializer")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Request cookies plus the serializer used to read and write signed ones.
#[derive(Debug, Clone)]
pub struct SecureCookies {
    values: HashMap<String, String>,
    serializer: SecureCookieSerializer,
    max_age: Option<i64>,
}

impl SecureCookies {
    pub fn new(
        values: HashMap<String, String>,
        serializer: SecureCookieSerializer,
        max_age: Option<i64>,
    ) -> Self {
        Self {
            values,
            serializer,
            max_age,
        }
    }

    pub fn from_request(
        request: &HttpRequest,
        serializer: SecureCookieSerializer,
        max_age: Option<i64>,
    ) -> Self {
        Self::new(request.cookies(), serializer, max_age)
    }

    /// Raw value of a request cookie.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Read and verify the signed cookie `name`.
    ///
    /// Missing, tampered, expired or undecodable cookies all yield `None`.
    pub fn load(&self, name: &str) -> Option<SessionData> {
        self.load_with_max_age(name, self.max_age)
    }

    /// Like [`load`](Self::load), checking the signature age against
    /// `max_age` instead of the jar-wide limit.
    pub fn load_with_max_age(&self, name: &str, max_age: Option<i64>) -> Option<SessionData> {
        let value = self.values.get(name)?;
        match self.serializer.deserialize(name, value, max_age) {
            Ok(data) => Some(data),
            Err(err) => {
                debug!(
                    target: "trestle::session",
                    "Ignoring session cookie '{}': {}",
                    name,
                    err
                );
                None
            }
        }
    }

    /// Sign `data` and queue it on the response as cookie `name`.
    pub fn save(
        &self,
        response: &mut HttpResponse,
        name: &str,
        data: &SessionData,
        options: &CookieOptions,
    ) -> SessionResult<()> {
        let value = self.serializer.serialize(name, data)?;
        response.set_cookie(options.to_set_cookie(name, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn serializer() -> SecureCookieSerializer {
        SecureCookieSerializer::new("0123456789abcdef0123456789abcdef")
    }

    fn data() -> SessionData {
        let mut data = SessionData::new();
        data.insert("user_id".to_string(), json!(42));
        data.insert("name".to_string(), json!("alice"));
        data
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = serializer();
        let value = signer.serialize_at("session", &data(), NOW).unwrap();
        assert_eq!(value.split('|').count(), 3);
        assert_eq!(
            signer.deserialize_at("session", &value, Some(60), NOW + 10),
            Ok(data())
        );
    }

    #[test]
    fn test_tampered_payload() {
        let signer = serializer();
        let value = signer.serialize_at("session", &data(), NOW).unwrap();
        let mut parts: Vec<&str> = value.split('|').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"v":1,"d":{"user_id":1}}"#);
        parts[0] = forged.as_str();
        assert_eq!(
            signer.deserialize_at("session", &parts.join("|"), None, NOW),
            Err(CookieError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_timestamp() {
        let signer = serializer();
        let value = signer.serialize_at("session", &data(), NOW).unwrap();
        let forged = value.replacen(&NOW.to_string(), &(NOW + 1000).to_string(), 1);
        assert_eq!(
            signer.deserialize_at("session", &forged, Some(60), NOW + 1000),
            Err(CookieError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_secret_or_name() {
        let value = serializer().serialize_at("session", &data(), NOW).unwrap();
        let other = SecureCookieSerializer::new("another-secret-another-secret-!!");
        assert_eq!(
            other.deserialize_at("session", &value, None, NOW),
            Err(CookieError::BadSignature)
        );
        assert_eq!(
            serializer().deserialize_at("db_session", &value, None, NOW),
            Err(CookieError::BadSignature)
        );
    }

    #[test]
    fn test_expired() {
        let signer = serializer();
        let value = signer.serialize_at("session", &data(), NOW).unwrap();
        assert_eq!(
            signer.deserialize_at("session", &value, Some(3600), NOW + 3601),
            Err(CookieError::Expired)
        );
        assert!(signer.deserialize_at("session", &value, None, NOW + 3601).is_ok());
        assert_eq!(
            signer.deserialize_at("session", &value, None, NOW - 3600),
            Err(CookieError::Expired)
        );
    }

    #[test]
    fn test_malformed_values() {
        let signer = serializer();
        for value in ["", "abc", "a|b", "a|b|c|d", "a|b|!!!"] {
            assert_eq!(
                signer.deserialize_at("session", value, None, NOW),
                Err(CookieError::Malformed),
                "{value}"
            );
        }
    }

    #[test]
    fn test_secure_cookies_load_recovers() {
        let signer = serializer();
        let good = signer.serialize("session", &data()).unwrap();
        let mut values = HashMap::new();
        values.insert("session".to_string(), good);
        values.insert("broken".to_string(), "garbage".to_string());

        let cookies = SecureCookies::new(values, signer, Some(3600));
        assert_eq!(cookies.load("session"), Some(data()));
        assert_eq!(cookies.load("broken"), None);
        assert_eq!(cookies.load("absent"), None);
        assert_eq!(cookies.raw("broken"), Some("garbage"));
    }

    #[test]
    fn test_secure_cookies_per_call_max_age() {
        let signer = serializer();
        let hour_ago = chrono::Utc::now().timestamp() - 3600;
        let mut values = HashMap::new();
        values.insert(
            "admin".to_string(),
            signer.serialize_at("admin", &data(), hour_ago).unwrap(),
        );

        let cookies = SecureCookies::new(values, signer, Some(14 * 24 * 3600));
        assert_eq!(cookies.load("admin"), Some(data()));
        assert_eq!(cookies.load_with_max_age("admin", Some(60)), None);
        assert_eq!(cookies.load_with_max_age("admin", None), Some(data()));
    }

    #[test]
    fn test_secure_cookies_save() {
        let cookies = SecureCookies::new(HashMap::new(), serializer(), None);
        let mut response = HttpResponse::ok();
        cookies
            .save(&mut response, "session", &data(), &CookieOptions::default())
            .unwrap();

        let cookie = response.cookie("session").unwrap();
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert!(cookie.http_only);
        assert_eq!(
            serializer().deserialize("session", &cookie.value, Some(60)),
            Ok(data())
        );
    }
}

//! Session configuration.

use crate::error::{SessionError, SessionResult};
use crate::dict::SessionDict;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use trestle_core::{SameSite, SetCookie};

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default lifetime of a session cookie: 14 days.
pub const DEFAULT_MAX_AGE: i64 = 14 * 24 * 60 * 60;

/// When a loaded session is written back to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Only sessions that were modified during the request.
    #[default]
    OnModified,
    /// Every existing session, refreshing its cookie (sliding expiration).
    /// Brand-new sessions that were never modified are still skipped.
    Always,
}

impl SavePolicy {
    pub fn should_save(&self, session: &SessionDict) -> bool {
        match self {
            SavePolicy::OnModified => session.is_modified(),
            SavePolicy::Always => session.is_modified() || !session.is_new(),
        }
    }
}

/// Attributes of the cookie carrying a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    /// `Max-Age` in seconds; `None` issues a browser-session cookie.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: None,
            secure: false,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl CookieOptions {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, seconds: Option<i64>) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.same_site = same_site;
        self
    }

    /// Build the `Set-Cookie` for `name=value` with these attributes.
    pub fn to_set_cookie(&self, name: &str, value: String) -> SetCookie {
        let mut cookie = SetCookie::new(name, value)
            .with_path(self.path.clone())
            .with_secure(self.secure)
            .with_http_only(self.http_only);
        if let Some(ref domain) = self.domain {
            cookie = cookie.with_domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            cookie = cookie.with_max_age(max_age);
        }
        if let Some(same_site) = self.same_site {
            cookie = cookie.with_same_site(same_site);
        }
        cookie
    }
}

/// Session configuration.
///
/// # Examples
///
/// ```
/// use trestle_session::{CookieOptions, SavePolicy, SessionConfig};
///
/// let config = SessionConfig::new("a-secret-of-at-least-thirty-two-bytes!!")
///     .unwrap()
///     .with_default_name("sid")
///     .with_max_age(Some(3600))
///     .with_cookie(CookieOptions::default().with_secure(true))
///     .with_save_policy(SavePolicy::Always);
///
/// assert_eq!(config.default_name, "sid");
/// assert_eq!(config.cookie.max_age, Some(3600));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key used to sign session cookies.
    pub secret: String,
    /// Session name used by `SessionStore::get_default_session`.
    pub default_name: String,
    /// Oldest accepted cookie signature, in seconds. `None` disables expiry.
    pub max_age: Option<i64>,
    /// Default cookie attributes for every session.
    pub cookie: CookieOptions,
    pub save_policy: SavePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: Self::generate_secret(),
            default_name: "session".to_string(),
            max_age: Some(DEFAULT_MAX_AGE),
            cookie: CookieOptions::default().with_max_age(Some(DEFAULT_MAX_AGE)),
            save_policy: SavePolicy::OnModified,
        }
    }
}

impl SessionConfig {
    /// Create a configuration signed with `secret`.
    pub fn new(secret: impl Into<String>) -> SessionResult<Self> {
        let config = Self {
            secret: secret.into(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Generate a random 256-bit secret.
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Parse a TOML document, e.g. the `[session]` table of an app config.
    ///
    /// ```
    /// use trestle_session::SessionConfig;
    ///
    /// let config = SessionConfig::from_toml_str(r#"
    ///     secret = "0123456789abcdef0123456789abcdef"
    ///     default_name = "app_session"
    ///     save_policy = "always"
    ///
    ///     [cookie]
    ///     secure = true
    ///     same_site = "strict"
    /// "#).unwrap();
    ///
    /// assert_eq!(config.default_name, "app_session");
    /// assert!(config.cookie.secure);
    /// ```
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `TRESTLE_SESSION_*` environment variables, reading a `.env`
    /// file first when one exists.
    ///
    /// `TRESTLE_SESSION_SECRET` is required. Optional: `_NAME`, `_MAX_AGE`,
    /// `_COOKIE_PATH`, `_COOKIE_DOMAIN`, `_COOKIE_SECURE`, `_SAVE_POLICY`.
    pub fn from_env() -> SessionResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of `TRESTLE_SESSION_*` variables.
    pub fn from_vars<I, K, V>(vars: I) -> SessionResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut secret = None;
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix("TRESTLE_SESSION_") else {
                continue;
            };
            let value: String = value.into();
            match key {
                "SECRET" => secret = Some(value),
                "NAME" => config.default_name = value,
                "MAX_AGE" => {
                    let seconds = parse_seconds(key, &value)?;
                    config.max_age = seconds;
                    config.cookie.max_age = seconds;
                }
                "COOKIE_PATH" => config.cookie.path = value,
                "COOKIE_DOMAIN" => config.cookie.domain = Some(value),
                "COOKIE_SECURE" => config.cookie.secure = parse_flag(&value),
                "SAVE_POLICY" => {
                    config.save_policy = match value.to_ascii_lowercase().as_str() {
                        "on_modified" => SavePolicy::OnModified,
                        "always" => SavePolicy::Always,
                        other => {
                            return Err(SessionError::Config(format!(
                                "unknown save policy '{}'",
                                other
                            )));
                        }
                    }
                }
                _ => {}
            }
        }

        config.secret = secret.ok_or_else(|| {
            SessionError::Config("TRESTLE_SESSION_SECRET is not set".to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants not enforced by the type system.
    pub fn validate(&self) -> SessionResult<()> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::Config(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.default_name.is_empty() {
            return Err(SessionError::Config(
                "default session name must not be empty".to_string(),
            ));
        }
        if matches!(self.max_age, Some(age) if age <= 0) {
            return Err(SessionError::Config("max_age must be positive".to_string()));
        }
        Ok(())
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Set both the signature window and the cookie `Max-Age`.
    pub fn with_max_age(mut self, seconds: Option<i64>) -> Self {
        self.max_age = seconds;
        self.cookie.max_age = seconds;
        self
    }

    pub fn with_cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie.path = path.into();
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = Some(domain.into());
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    pub fn with_cookie_http_only(mut self, http_only: bool) -> Self {
        self.cookie.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.cookie.same_site = same_site;
        self
    }

    pub fn with_save_policy(mut self, policy: SavePolicy) -> Self {
        self.save_policy = policy;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_seconds(key: &str, value: &str) -> SessionResult<Option<i64>> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|e| SessionError::Config(format!("TRESTLE_SESSION_{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_name, "session");
        assert_eq!(config.cookie.path, "/");
        assert!(config.cookie.http_only);
        assert_ne!(config.secret, SessionConfig::default().secret);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            SessionConfig::new("too-short"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new(SECRET)
            .unwrap()
            .with_default_name("app")
            .with_max_age(None)
            .with_cookie_path("/app")
            .with_cookie_domain("example.com")
            .with_cookie_secure(true)
            .with_cookie_http_only(false)
            .with_same_site(Some(SameSite::Strict));

        assert_eq!(config.default_name, "app");
        assert_eq!(config.max_age, None);
        assert_eq!(config.cookie.max_age, None);
        assert_eq!(config.cookie.path, "/app");
        assert_eq!(config.cookie.domain.as_deref(), Some("example.com"));
        assert!(config.cookie.secure);
        assert!(!config.cookie.http_only);
        assert_eq!(config.cookie.same_site, Some(SameSite::Strict));
    }

    #[test]
    fn test_from_toml() {
        let config = SessionConfig::from_toml_str(&format!(
            "secret = \"{}\"\nmax_age = 600\n[cookie]\npath = \"/admin\"\nsame_site = \"none\"\n",
            SECRET
        ))
        .unwrap();
        assert_eq!(config.max_age, Some(600));
        assert_eq!(config.cookie.path, "/admin");
        assert_eq!(config.cookie.same_site, Some(SameSite::None));
        assert_eq!(config.save_policy, SavePolicy::OnModified);
    }

    #[test]
    fn test_from_toml_rejects_bad_input() {
        assert!(SessionConfig::from_toml_str("secret = \"short\"").is_err());
        assert!(SessionConfig::from_toml_str("secret = [").is_err());
    }

    #[test]
    fn test_from_vars() {
        let config = SessionConfig::from_vars([
            ("TRESTLE_SESSION_SECRET", SECRET),
            ("TRESTLE_SESSION_NAME", "sid"),
            ("TRESTLE_SESSION_MAX_AGE", "120"),
            ("TRESTLE_SESSION_COOKIE_SECURE", "true"),
            ("TRESTLE_SESSION_SAVE_POLICY", "always"),
            ("UNRELATED", "ignored"),
        ])
        .unwrap();

        assert_eq!(config.default_name, "sid");
        assert_eq!(config.max_age, Some(120));
        assert_eq!(config.cookie.max_age, Some(120));
        assert!(config.cookie.secure);
        assert_eq!(config.save_policy, SavePolicy::Always);
    }

    #[test]
    fn test_from_vars_requires_secret() {
        let err = SessionConfig::from_vars([("TRESTLE_SESSION_NAME", "sid")]).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));

        let err = SessionConfig::from_vars([
            ("TRESTLE_SESSION_SECRET", SECRET),
            ("TRESTLE_SESSION_MAX_AGE", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_cookie_options_to_set_cookie() {
        let options = CookieOptions::default()
            .with_domain("example.com")
            .with_max_age(Some(60))
            .with_secure(true);
        let cookie = options.to_set_cookie("session", "value".to_string());
        assert_eq!(
            cookie.to_string(),
            "session=value; Path=/; Domain=example.com; Max-Age=60; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_save_policy() {
        let mut fresh = SessionDict::new();
        let existing = SessionDict::from_data(Default::default());

        assert!(!SavePolicy::OnModified.should_save(&fresh));
        assert!(!SavePolicy::OnModified.should_save(&existing));
        assert!(!SavePolicy::Always.should_save(&fresh));
        assert!(SavePolicy::Always.should_save(&existing));

        fresh.clear();
        assert!(SavePolicy::OnModified.should_save(&fresh));
    }
}

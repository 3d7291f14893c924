use crate::error::{CookieError, Result};
use chrono::{DateTime, Duration, Utc};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied to a session cookie.
///
/// `max_age` follows the browser semantics:
/// - `0`: no `Max-Age` attribute (cookie lives for the browser session)
/// - negative: delete the cookie now
/// - positive: lifetime in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Cookie path
    pub path: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Lifetime in seconds
    pub max_age: i64,

    /// Cookie secure flag (HTTPS only)
    pub secure: bool,

    /// Cookie HttpOnly flag
    pub http_only: bool,

    /// Cookie SameSite policy
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 0,
            secure: false,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl CookieOptions {
    /// Set cookie path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set cookie max age in seconds
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set cookie secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set cookie HttpOnly flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.same_site = same_site;
        self
    }
}

/// A cookie to be sent in a `Set-Cookie` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// An empty cookie that instructs the browser to drop `name` immediately.
    pub fn removal(name: impl Into<String>, options: &CookieOptions) -> Self {
        Self::new(name, "", options.clone().with_max_age(-1))
    }

    /// Render the `Set-Cookie` header value.
    pub fn to_header_string(&self) -> String {
        self.render_at(Utc::now())
    }

    fn render_at(&self, now: DateTime<Utc>) -> String {
        let options = &self.options;
        let mut cookie = format!("{}={}; Path={}", self.name, self.value, options.path);

        if let Some(ref domain) = options.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if options.max_age > 0 {
            let expires = now + Duration::seconds(options.max_age);
            cookie.push_str(&format!(
                "; Expires={}; Max-Age={}",
                http_date(expires),
                options.max_age
            ));
        } else if options.max_age < 0 {
            let epoch = DateTime::from_timestamp(1, 0).unwrap_or_default();
            cookie.push_str(&format!("; Expires={}; Max-Age=0", http_date(epoch)));
        }

        if options.secure {
            cookie.push_str("; Secure");
        }

        if options.http_only {
            cookie.push_str("; HttpOnly");
        }

        if let Some(same_site) = options.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
        }

        cookie
    }

    pub fn header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.to_header_string())
            .map_err(|e| CookieError::InvalidHeader(e.to_string()))
    }

    /// Append this cookie to a response header map.
    pub fn append_to(&self, headers: &mut HeaderMap) -> Result<()> {
        headers.append(SET_COOKIE, self.header_value()?);
        Ok(())
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Find the first cookie called `name` in the request's `Cookie` headers.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

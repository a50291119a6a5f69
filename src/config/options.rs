//! Medium write options.
//!
//! These mirror cookie attributes. Media that have no notion of scope or
//! lifetime (memory, files) accept and ignore the ones they can't honour.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// The cookie `SameSite` attribute.
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

/// Options passed to the medium on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageOptions {
    /// Scope path. Defaults to `/`, the broadest scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Absolute expiry time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// Lifetime in seconds from the write. Wins over `expires` when both are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    pub secure: bool,

    pub http_only: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            domain: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

impl StorageOptions {
    /// Set the path scope.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the domain scope.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Expire at a fixed time. Ignored when `max_age` is set.
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Expire `seconds` after each write.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Restrict to secure transports.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Hide from scripts.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the `SameSite` policy.
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// When a value written at `written_at` stops being readable.
    ///
    /// `None` means it lives for the session of the medium.
    /// A `max_age` too large to add to `written_at` is an
    /// [`PersistError::ExpiryOutOfRange`].
    pub fn expiry_from(
        &self,
        written_at: DateTime<Utc>,
    ) -> crate::error::Result<Option<DateTime<Utc>>> {
        let Some(max_age) = self.max_age else {
            return Ok(self.expires);
        };
        Duration::try_seconds(max_age)
            .and_then(|lifetime| written_at.checked_add_signed(lifetime))
            .map(Some)
            .ok_or(PersistError::ExpiryOutOfRange { max_age })
    }

    /// Render the `Set-Cookie` attribute tail (`; Path=/; Secure ...`).
    pub fn cookie_attributes(&self) -> String {
        let mut out = String::new();
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={}", path));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={}", domain));
        }
        if let Some(expires) = &self.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if let Some(same_site) = self.same_site {
            out.push_str(&format!("; SameSite={}", same_site.as_str()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_scope_is_root_path() {
        let opts = StorageOptions::default();
        assert_eq!(opts.path.as_deref(), Some("/"));
        assert!(opts.domain.is_none());
        assert!(!opts.secure);
    }

    #[test]
    fn max_age_wins_over_expires() {
        let written = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let opts = StorageOptions::default()
            .with_expires(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
            .with_max_age(60);
        assert_eq!(
            opts.expiry_from(written).unwrap(),
            Some(written + Duration::seconds(60))
        );
    }

    #[test]
    fn huge_max_age_is_an_error() {
        let now = Utc::now();
        for max_age in [10_000_000_000_000, i64::MAX, i64::MIN] {
            let err = StorageOptions::default()
                .with_max_age(max_age)
                .expiry_from(now)
                .unwrap_err();
            assert!(matches!(err, PersistError::ExpiryOutOfRange { max_age: m } if m == max_age));
        }
    }

    #[test]
    fn session_values_have_no_expiry() {
        let now = Utc::now();
        assert_eq!(StorageOptions::default().expiry_from(now).unwrap(), None);
    }

    #[test]
    fn cookie_attributes_render_in_order() {
        let opts = StorageOptions::default()
            .with_domain("example.com")
            .with_expires(Utc.with_ymd_and_hms(2027, 3, 9, 12, 30, 0).unwrap())
            .with_http_only(true)
            .with_secure(true)
            .with_same_site(SameSite::Lax);
        assert_eq!(
            opts.cookie_attributes(),
            "; Path=/; Domain=example.com; Expires=Tue, 09 Mar 2027 12:30:00 GMT; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn deserializes_partial_yaml_with_defaults() {
        let opts: StorageOptions = serde_yaml::from_str("max_age: 3600\nsame_site: strict").unwrap();
        assert_eq!(opts.path.as_deref(), Some("/"));
        assert_eq!(opts.max_age, Some(3600));
        assert_eq!(opts.same_site, Some(SameSite::Strict));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<StorageOptions, _> = serde_yaml::from_str("sticky: true");
        assert!(result.is_err());
    }
}

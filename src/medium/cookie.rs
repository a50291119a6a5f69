//! Cookie-store medium.
//!
//! `CookieJar` keeps values the way a browser cookie store does: values
//! are percent-encoded, each cookie is limited to [`MAX_COOKIE_BYTES`],
//! and a cookie past its expiry is gone on the next read. A jar can be
//! seeded from a `Cookie` request header and rendered back out as
//! `Set-Cookie` response headers.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::StorageMedium;
use crate::config::StorageOptions;
use crate::error::{PersistError, Result};

/// Per-cookie size limit (name, `=`, and encoded value).
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Characters not allowed in a cookie name.
const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
struct StoredCookie {
    /// Percent-encoded value.
    encoded: String,
    options: StorageOptions,
    expires_at: Option<DateTime<Utc>>,
}

/// A cookie store keyed by cookie name.
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
    clock: Clock,
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Create an empty jar using the system clock.
    pub fn new() -> Self {
        Self {
            cookies: Mutex::new(BTreeMap::new()),
            clock: Arc::new(Utc::now),
        }
    }

    /// Use `clock` instead of the system clock for expiry checks.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Seed a jar from a `Cookie` request header (`a=1; b=2`).
    ///
    /// Pairs without `=` are skipped. Values are kept in their encoded form
    /// and decoded on read.
    pub fn from_cookie_header(header: &str) -> Self {
        let jar = Self::new();
        {
            let mut cookies = jar.lock();
            for pair in header.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                cookies.insert(
                    name.to_string(),
                    StoredCookie {
                        encoded: value.trim().trim_matches('"').to_string(),
                        options: StorageOptions::default(),
                        expires_at: None,
                    },
                );
            }
        }
        jar
    }

    /// Render live cookies as a `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        let now = (self.clock)();
        let mut cookies = self.lock();
        purge_expired(&mut cookies, now);
        cookies
            .iter()
            .map(|(name, cookie)| format!("{}={}", name, cookie.encoded))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Render live cookies as `Set-Cookie` header values, by name.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let now = (self.clock)();
        let mut cookies = self.lock();
        purge_expired(&mut cookies, now);
        cookies
            .iter()
            .map(|(name, cookie)| {
                format!(
                    "{}={}{}",
                    name,
                    cookie.encoded,
                    cookie.options.cookie_attributes()
                )
            })
            .collect()
    }

    /// Number of live cookies.
    pub fn len(&self) -> usize {
        let now = (self.clock)();
        let mut cookies = self.lock();
        purge_expired(&mut cookies, now);
        cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn purge_expired(cookies: &mut BTreeMap<String, StoredCookie>, now: DateTime<Utc>) {
    cookies.retain(|_, cookie| cookie.expires_at.is_none_or(|at| at > now));
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_control() || SEPARATORS.contains(c)) {
        return Err(PersistError::Other(anyhow!("Invalid cookie name: {:?}", name)));
    }
    Ok(())
}

impl StorageMedium for CookieJar {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let now = (self.clock)();
        let mut cookies = self.lock();
        purge_expired(&mut cookies, now);

        let Some(cookie) = cookies.get(key) else {
            return Ok(None);
        };
        let decoded = urlencoding::decode(&cookie.encoded)
            .map_err(|e| PersistError::Other(anyhow!("Cookie '{}' is not valid UTF-8: {}", key, e)))?;
        Ok(Some(decoded.into_owned()))
    }

    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()> {
        validate_name(key)?;

        let now = (self.clock)();
        let expires_at = options.expiry_from(now)?;

        // Writing an already-expired cookie is how a cookie store deletes one
        if expires_at.is_some_and(|at| at <= now) {
            self.lock().remove(key);
            return Ok(());
        }

        let encoded = urlencoding::encode(value).into_owned();
        let size = key.len() + 1 + encoded.len();
        if size > MAX_COOKIE_BYTES {
            return Err(PersistError::QuotaExceeded {
                key: key.to_string(),
                size,
                limit: MAX_COOKIE_BYTES,
            });
        }

        self.lock().insert(
            key.to_string(),
            StoredCookie {
                encoded,
                options: options.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str, _options: &StorageOptions) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn opts() -> StorageOptions {
        StorageOptions::default()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn values_roundtrip_through_percent_encoding() {
        let jar = CookieJar::new();
        jar.set("redux", r#"{"count":5,"name":"a b;c"}"#, &opts()).unwrap();

        let header = jar.cookie_header();
        assert!(!header.contains('"'));
        assert!(!header[6..].contains(';'));
        assert_eq!(
            jar.get("redux").unwrap().as_deref(),
            Some(r#"{"count":5,"name":"a b;c"}"#)
        );
    }

    #[test]
    fn oversized_value_exceeds_quota() {
        let jar = CookieJar::new();
        let big = "x".repeat(MAX_COOKIE_BYTES);
        let err = jar.set("redux", &big, &opts()).unwrap_err();
        match err {
            PersistError::QuotaExceeded { size, limit, .. } => {
                assert_eq!(size, MAX_COOKIE_BYTES + 6);
                assert_eq!(limit, MAX_COOKIE_BYTES);
            }
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }
        assert_eq!(jar.get("redux").unwrap(), None);
    }

    #[test]
    fn value_at_exact_limit_is_accepted() {
        let jar = CookieJar::new();
        let value = "x".repeat(MAX_COOKIE_BYTES - "redux=".len());
        jar.set("redux", &value, &opts()).unwrap();
        assert!(jar.get("redux").unwrap().is_some());
    }

    #[test]
    fn encoding_counts_toward_the_limit() {
        let jar = CookieJar::new();
        // Each '{' encodes to three bytes
        let value = "{".repeat(MAX_COOKIE_BYTES / 3);
        assert!(matches!(
            jar.set("redux", &value, &opts()),
            Err(PersistError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn expired_cookies_disappear() {
        let now = Arc::new(Mutex::new(fixed_time()));
        let clock = now.clone();
        let jar = CookieJar::new().with_clock(move || *clock.lock().unwrap());

        jar.set("redux", "1", &opts().with_max_age(60)).unwrap();
        assert!(jar.get("redux").unwrap().is_some());

        *now.lock().unwrap() = fixed_time() + Duration::seconds(61);
        assert_eq!(jar.get("redux").unwrap(), None);
        assert!(jar.is_empty());
    }

    #[test]
    fn writing_with_past_expiry_deletes() {
        let jar = CookieJar::new().with_clock(fixed_time);
        jar.set("redux", "1", &opts()).unwrap();
        jar.set(
            "redux",
            "2",
            &opts().with_expires(fixed_time() - Duration::days(1)),
        )
        .unwrap();
        assert_eq!(jar.get("redux").unwrap(), None);
    }

    #[test]
    fn past_expiry_deletes_even_when_oversized() {
        let jar = CookieJar::new().with_clock(fixed_time);
        jar.set("redux", "1", &opts()).unwrap();

        let big = "x".repeat(MAX_COOKIE_BYTES);
        jar.set("redux", &big, &opts().with_max_age(0)).unwrap();
        assert_eq!(jar.get("redux").unwrap(), None);
    }

    #[test]
    fn out_of_range_max_age_is_rejected() {
        let jar = CookieJar::new();
        let err = jar
            .set("redux", "1", &opts().with_max_age(10_000_000_000_000))
            .unwrap_err();
        assert!(matches!(err, PersistError::ExpiryOutOfRange { .. }));
        assert!(jar.is_empty());
    }

    #[test]
    fn zero_max_age_deletes() {
        let jar = CookieJar::new();
        jar.set("redux", "1", &opts()).unwrap();
        jar.set("redux", "1", &opts().with_max_age(0)).unwrap();
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn parses_cookie_header() {
        let jar = CookieJar::from_cookie_header("theme=dark; redux=%7B%22count%22%3A5%7D; junk");
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(jar.get("redux").unwrap().as_deref(), Some(r#"{"count":5}"#));
    }

    #[test]
    fn invalid_encoding_is_a_read_error() {
        let jar = CookieJar::from_cookie_header("redux=%FF%FE");
        assert!(jar.get("redux").is_err());
    }

    #[test]
    fn rejects_invalid_names() {
        let jar = CookieJar::new();
        assert!(jar.set("", "v", &opts()).is_err());
        assert!(jar.set("a=b", "v", &opts()).is_err());
        assert!(jar.set("a b", "v", &opts()).is_err());
    }

    #[test]
    fn set_cookie_headers_include_attributes() {
        let jar = CookieJar::new();
        jar.set(
            "redux",
            r#"{"count":6}"#,
            &opts().with_secure(true).with_same_site(crate::config::SameSite::Strict),
        )
        .unwrap();
        insta::assert_snapshot!(
            jar.set_cookie_headers().join("\n"),
            @"redux=%7B%22count%22%3A6%7D; Path=/; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn remove_deletes_cookie() {
        let jar = CookieJar::from_cookie_header("redux=1");
        jar.remove("redux", &opts()).unwrap();
        assert_eq!(jar.get("redux").unwrap(), None);
    }
}

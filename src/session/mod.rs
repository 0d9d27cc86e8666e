//! Per-client session state
//!
//! A session is addressed by an opaque id carried in a cookie and holds the
//! CSRF token plus the contact form rate-limit counters. Stores are injected
//! into the handlers so tests can use a fresh in-memory map.

mod memory;

pub use memory::MemorySessionStore;

use crate::config::SessionConfig;
use crate::contact::rate_limit::RateLimitEntry;
use hyper::header::COOKIE;
use hyper::HeaderMap;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;

/// Mutable state of one session
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub csrf_token: Option<String>,
    /// Keyed by hashed client IP
    pub rate_limits: HashMap<String, RateLimitEntry>,
}

/// Key-value store of sessions keyed by session id.
///
/// `with_session` runs the closure while the session is exclusively held, so
/// read-modify-write sequences on one session never interleave.
pub trait SessionStore: Send + Sync {
    /// Whether a live (non-expired) session exists for `id`
    fn contains(&self, id: &str) -> bool;

    /// Run `f` against the session for `id`, creating it when absent
    fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R;

    /// Drop expired sessions, returning how many were removed
    fn purge_expired(&self) -> usize;
}

/// Session id bound to the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    /// True when the id was minted for this request and must be sent back
    pub is_new: bool,
}

impl SessionHandle {
    /// Reuse the session named by the request cookie, or mint a new one.
    ///
    /// Unknown or expired ids are never adopted.
    pub fn resolve<S: SessionStore>(headers: &HeaderMap, cookie_name: &str, store: &S) -> Self {
        match cookie_value(headers, cookie_name) {
            Some(id) if is_well_formed(&id) && store.contains(&id) => Self { id, is_new: false },
            _ => Self {
                id: random_token(),
                is_new: true,
            },
        }
    }

    /// `Set-Cookie` value for a newly minted session
    pub fn set_cookie(&self, cfg: &SessionConfig) -> Option<String> {
        if !self.is_new {
            return None;
        }
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            cfg.cookie_name, self.id
        );
        if cfg.secure_cookie {
            cookie.push_str("; Secure");
        }
        Some(cookie)
    }
}

/// 32 random bytes from the OS RNG, hex-encoded
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_well_formed(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Extract a cookie value from all `Cookie` headers
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use std::time::Duration;

    fn session_config() -> SessionConfig {
        SessionConfig {
            cookie_name: "SITESESSID".to_string(),
            ttl_secs: 60,
            secure_cookie: true,
        }
    }

    #[test]
    fn test_random_token_shape() {
        let a = random_token();
        let b = random_token();
        assert_eq!(a.len(), 64);
        assert!(is_well_formed(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cookie_value_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; SITESESSID=abc"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, "SITESESSID").as_deref(), Some("abc"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_resolve_reuses_known_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = random_token();
        store.with_session(&id, |s| s.csrf_token = Some("t".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("SITESESSID={id}")).unwrap(),
        );
        let handle = SessionHandle::resolve(&headers, "SITESESSID", &store);
        assert_eq!(handle.id, id);
        assert!(!handle.is_new);
        assert!(handle.set_cookie(&session_config()).is_none());
    }

    #[test]
    fn test_resolve_rejects_unknown_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("SITESESSID=attacker-chosen"));

        let handle = SessionHandle::resolve(&headers, "SITESESSID", &store);
        assert!(handle.is_new);
        assert_ne!(handle.id, "attacker-chosen");
        let cookie = handle.set_cookie(&session_config()).unwrap();
        assert!(cookie.starts_with(&format!("SITESESSID={}", handle.id)));
        assert!(cookie.ends_with("; Secure"));
    }
}

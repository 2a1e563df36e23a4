//! Request-scoped cookie jar backing the `TokenStore` trait.
//!
//! Built from the incoming `Cookie` header; every write or clear queues a
//! `Set-Cookie` header that the web layer copies onto the outgoing response.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use secrecy::SecretString;

use super::store::{SessionKey, TokenStore};

/// Attributes shared by every session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CookieAttributes {
    pub secure: bool,
}

#[derive(Debug, Default)]
struct Jar {
    /// Current values, with writes from this request applied.
    values: HashMap<SessionKey, String>,
    /// Pending `Set-Cookie` values, last write per key wins.
    pending: Vec<(SessionKey, String)>,
}

/// `TokenStore` over one request/response cycle's cookies.
#[derive(Debug)]
pub struct CookieTokenStore {
    attributes: CookieAttributes,
    jar: Mutex<Jar>,
}

impl CookieTokenStore {
    /// Parse the session cookies out of a request's headers.
    pub fn from_headers(headers: &HeaderMap, attributes: CookieAttributes) -> Self {
        let mut values = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                let Some((name, value)) = pair.trim().split_once('=') else {
                    continue;
                };
                if let Some(key) = SessionKey::from_cookie_name(name.trim()) {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() {
                        values.insert(key, value.to_string());
                    }
                }
            }
        }
        Self {
            attributes,
            jar: Mutex::new(Jar {
                values,
                pending: Vec::new(),
            }),
        }
    }

    /// Plain (non-secret) read, for values such as the user id.
    pub fn get_plain(&self, key: SessionKey) -> Option<String> {
        self.lock().values.get(&key).cloned()
    }

    /// Queued `Set-Cookie` header values, in write order.
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.lock().pending.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Append the queued `Set-Cookie` headers to `headers`.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        for value in self.set_cookie_values() {
            match HeaderValue::from_str(&value) {
                Ok(v) => {
                    headers.append(SET_COOKIE, v);
                }
                Err(e) => tracing::warn!("Dropping unrepresentable Set-Cookie header: {}", e),
            }
        }
    }

    fn queue(&self, key: SessionKey, header: String, value: Option<&str>) {
        let mut jar = self.lock();
        match value {
            Some(v) => {
                jar.values.insert(key, v.to_string());
            }
            None => {
                jar.values.remove(&key);
            }
        }
        jar.pending.retain(|(k, _)| *k != key);
        jar.pending.push((key, header));
    }

    fn set_cookie_header(&self, key: SessionKey, value: &str, max_age: Duration) -> String {
        let mut header = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            key.cookie_name(),
            value,
            max_age.as_secs()
        );
        if self.attributes.secure {
            header.push_str("; Secure");
        }
        header
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Jar> {
        self.jar.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// RFC 6265 `cookie-octet`: visible ASCII minus `"`, `,`, `;` and `\`.
fn is_cookie_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

impl TokenStore for CookieTokenStore {
    fn get(&self, key: SessionKey) -> Option<SecretString> {
        self.get_plain(key).map(SecretString::from)
    }

    fn set(&self, key: SessionKey, value: &str, max_age: Duration) {
        if !is_cookie_value(value) {
            tracing::warn!(cookie = %key, "Refusing to store a value outside the cookie-octet set");
            return;
        }
        let header = self.set_cookie_header(key, value, max_age);
        self.queue(key, header, Some(value));
    }

    fn clear(&self, key: SessionKey) {
        let header = self.set_cookie_header(key, "", Duration::ZERO);
        self.queue(key, header, None);
    }
}

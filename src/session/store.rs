//! `TokenStore` trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use secrecy::SecretString;

use crate::config::AppConfig;

/// Values kept in the session cookie jar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    UserId,
}

impl SessionKey {
    pub const ALL: [SessionKey; 3] = [Self::AccessToken, Self::RefreshToken, Self::UserId];

    /// Cookie name for this key.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::UserId => "user_id",
        }
    }

    pub fn from_cookie_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.cookie_name() == name)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cookie_name())
    }
}

/// Credential storage used by the request pipeline.
///
/// Implementations use interior mutability so a single store can be shared
/// by reference across the awaits of one request.
pub trait TokenStore: Send + Sync {
    /// Latest value for `key`, including writes made earlier in this session.
    fn get(&self, key: SessionKey) -> Option<SecretString>;

    /// Persist `value` under `key` for `max_age`.
    fn set(&self, key: SessionKey, value: &str, max_age: Duration);

    /// Remove `key`. Only explicit logout calls this.
    fn clear(&self, key: SessionKey);
}

/// Max-age policy applied when tokens are issued or rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_token_max_age: Duration,
    pub refresh_token_max_age: Duration,
}

impl TokenPolicy {
    /// Server-supplied lifetime when present, configured default otherwise.
    pub fn access_max_age(&self, server_secs: Option<u64>) -> Duration {
        server_secs
            .map(Duration::from_secs)
            .unwrap_or(self.access_token_max_age)
    }

    pub fn refresh_max_age(&self, server_secs: Option<u64>) -> Duration {
        server_secs
            .map(Duration::from_secs)
            .unwrap_or(self.refresh_token_max_age)
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for TokenPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            access_token_max_age: config.access_token_max_age,
            refresh_token_max_age: config.refresh_token_max_age,
        }
    }
}

/// Entry in `MemoryTokenStore`.
#[derive(Debug, Clone)]
struct StoredValue {
    value: SecretString,
    max_age: Duration,
}

/// In-memory `TokenStore`, used by tests and non-browser callers.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<SessionKey, StoredValue>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with an access/refresh pair.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        let policy = TokenPolicy::default();
        if let Some(access) = access {
            store.set(SessionKey::AccessToken, access, policy.access_token_max_age);
        }
        if let Some(refresh) = refresh {
            store.set(SessionKey::RefreshToken, refresh, policy.refresh_token_max_age);
        }
        store
    }

    /// Max-age recorded by the most recent `set` for `key`.
    pub fn max_age(&self, key: SessionKey) -> Option<Duration> {
        self.lock().get(&key).map(|v| v.max_age)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, StoredValue>> {
        // A poisoned map still holds consistent values; keep serving them.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: SessionKey) -> Option<SecretString> {
        self.lock().get(&key).map(|v| v.value.clone())
    }

    fn set(&self, key: SessionKey, value: &str, max_age: Duration) {
        self.lock().insert(
            key,
            StoredValue {
                value: SecretString::from(value.to_string()),
                max_age,
            },
        );
    }

    fn clear(&self, key: SessionKey) {
        self.lock().remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn cookie_names_round_trip() {
        for key in SessionKey::ALL {
            assert_eq!(SessionKey::from_cookie_name(key.cookie_name()), Some(key));
        }
        assert_eq!(SessionKey::from_cookie_name("theme"), None);
    }

    #[test]
    fn memory_store_set_get_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.get(SessionKey::AccessToken).is_none());

        store.set(SessionKey::AccessToken, "abc", Duration::from_secs(60));
        assert_eq!(store.get(SessionKey::AccessToken).unwrap().expose_secret(), "abc");
        assert_eq!(store.max_age(SessionKey::AccessToken), Some(Duration::from_secs(60)));

        store.clear(SessionKey::AccessToken);
        assert!(store.get(SessionKey::AccessToken).is_none());
    }

    #[test]
    fn access_absent_does_not_imply_refresh_absent() {
        let store = MemoryTokenStore::with_tokens(None, Some("refresh-1"));
        assert!(store.get(SessionKey::AccessToken).is_none());
        assert_eq!(store.get(SessionKey::RefreshToken).unwrap().expose_secret(), "refresh-1");
    }

    #[test]
    fn policy_prefers_server_lifetime() {
        let policy = TokenPolicy::default();
        assert_eq!(policy.access_max_age(Some(120)), Duration::from_secs(120));
        assert_eq!(policy.access_max_age(None), Duration::from_secs(900));
        assert_eq!(policy.refresh_max_age(None), Duration::from_secs(604_800));
    }
}

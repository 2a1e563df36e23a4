//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// BFF configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the backend REST API, without a trailing slash.
    pub api_base_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Whether session cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Default max-age for the access token cookie.
    pub access_token_max_age: Duration,
    /// Default max-age for the refresh token cookie.
    pub refresh_token_max_age: Duration,
    /// Upper bound on any single backend call.
    pub request_timeout: Duration,
    /// Allowed browser origin for CORS. `None` = permissive (development).
    pub cors_origin: Option<String>,
    /// Onboarding wizards untouched for this long are dropped.
    pub onboarding_idle_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            cookie_secure: false,
            access_token_max_age: Duration::from_secs(15 * 60),
            refresh_token_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            request_timeout: Duration::from_secs(30),
            cors_origin: None,
            onboarding_idle_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl AppConfig {
    /// Load configuration from `HEALTH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = match lookup("HEALTH_API_BASE_URL") {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.api_base_url,
        };

        let cookie_secure = lookup("HEALTH_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(defaults.cookie_secure);

        Ok(Self {
            api_base_url,
            bind_addr: lookup("HEALTH_BIND_ADDR").unwrap_or(defaults.bind_addr),
            cookie_secure,
            access_token_max_age: secs_or(
                &lookup,
                "HEALTH_ACCESS_TOKEN_MAX_AGE_SECS",
                defaults.access_token_max_age,
            )?,
            refresh_token_max_age: secs_or(
                &lookup,
                "HEALTH_REFRESH_TOKEN_MAX_AGE_SECS",
                defaults.refresh_token_max_age,
            )?,
            request_timeout: secs_or(&lookup, "HEALTH_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            cors_origin: lookup("HEALTH_CORS_ORIGIN").filter(|s| !s.trim().is_empty()),
            onboarding_idle_timeout: secs_or(
                &lookup,
                "HEALTH_ONBOARDING_IDLE_SECS",
                defaults.onboarding_idle_timeout,
            )?,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            key: "HEALTH_API_BASE_URL".to_string(),
            message: format!("expected an http(s) URL, got {raw:?}"),
        });
    }
    Ok(trimmed.to_string())
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.access_token_max_age, Duration::from_secs(900));
        assert_eq!(config.refresh_token_max_age, Duration::from_secs(604_800));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.cookie_secure);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn production_turns_on_secure_cookies() {
        let config = AppConfig::from_lookup(lookup_from(&[("HEALTH_ENV", "Production")])).unwrap();
        assert!(config.cookie_secure);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "HEALTH_API_BASE_URL",
            "https://api.example.com/v1/",
        )]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/v1");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = AppConfig::from_lookup(lookup_from(&[("HEALTH_API_BASE_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "HEALTH_API_BASE_URL"));
    }

    #[test]
    fn rejects_non_numeric_max_age() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "HEALTH_ACCESS_TOKEN_MAX_AGE_SECS",
            "fifteen",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn overrides_max_ages() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HEALTH_ACCESS_TOKEN_MAX_AGE_SECS", "60"),
            ("HEALTH_REFRESH_TOKEN_MAX_AGE_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.access_token_max_age, Duration::from_secs(60));
        assert_eq!(config.refresh_token_max_age, Duration::from_secs(3600));
    }
}

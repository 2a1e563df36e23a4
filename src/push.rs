//! Web Push subscription payloads.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Registration body accepted by `POST /push/subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub p256dh_key: String,
    pub auth_key: String,
}

/// The browser's `PushSubscription.toJSON()` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserPushSubscription {
    pub endpoint: String,
    pub keys: BrowserPushKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserPushKeys {
    pub p256dh: String,
    pub auth: String,
}

impl From<BrowserPushSubscription> for PushSubscription {
    fn from(sub: BrowserPushSubscription) -> Self {
        Self {
            endpoint: sub.endpoint,
            p256dh_key: sub.keys.p256dh,
            auth_key: sub.keys.auth,
        }
    }
}

impl PushSubscription {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.endpoint.starts_with("https://") {
            return Err(ApiError::validation(
                "endpoint",
                "Push endpoint must be an https URL",
            ));
        }
        if self.p256dh_key.trim().is_empty() {
            return Err(ApiError::validation("p256dh_key", "Missing p256dh key"));
        }
        if self.auth_key.trim().is_empty() {
            return Err(ApiError::validation("auth_key", "Missing auth key"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_browser_json() {
        let browser: BrowserPushSubscription = serde_json::from_str(
            r#"{"endpoint":"https://push.example.com/abc","expirationTime":null,"keys":{"p256dh":"BPk","auth":"xyz"}}"#,
        )
        .unwrap();
        let sub = PushSubscription::from(browser);
        assert_eq!(sub.endpoint, "https://push.example.com/abc");
        assert_eq!(sub.p256dh_key, "BPk");
        assert_eq!(sub.auth_key, "xyz");
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn rejects_plain_http_endpoint() {
        let sub = PushSubscription {
            endpoint: "http://push.example.com/abc".into(),
            p256dh_key: "k".into(),
            auth_key: "a".into(),
        };
        assert!(matches!(sub.validate(), Err(ApiError::Validation { ref field, .. }) if field == "endpoint"));
    }

    #[test]
    fn rejects_missing_keys() {
        let sub = PushSubscription {
            endpoint: "https://push.example.com/abc".into(),
            p256dh_key: " ".into(),
            auth_key: "a".into(),
        };
        assert!(sub.validate().is_err());
    }
}

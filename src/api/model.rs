//! Backend data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Highest JIS prefecture code (Okinawa).
pub const MAX_PREFECTURE_CODE: u8 = 47;
/// Upper bound on selected concern topics.
pub const MAX_CONCERN_TOPICS: usize = 10;

/// The signed-in user, as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub prefecture_code: Option<u8>,
    #[serde(default)]
    pub concern_topics: Vec<String>,
    #[serde(default)]
    pub notification_enabled: bool,
}

impl UserProfile {
    /// Whether the prefecture onboarding step is already satisfied.
    pub fn has_prefecture(&self) -> bool {
        self.prefecture_code.is_some()
    }
}

/// Token pair issued by `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    pub user: LoginUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One day's condition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: String,
    pub date: NaiveDate,
    /// 1 (bad) ..= 5 (good).
    pub condition_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub trigger_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /daily-logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDailyLog {
    pub date: NaiveDate,
    pub condition_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub trigger_ids: Vec<String>,
}

impl NewDailyLog {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(1..=5).contains(&self.condition_score) {
            return Err(ApiError::validation(
                "condition_score",
                "Condition score must be between 1 and 5",
            ));
        }
        if self.date > Utc::now().date_naive() {
            return Err(ApiError::validation("date", "Date cannot be in the future"));
        }
        if let Some(note) = &self.note {
            if note.chars().count() > 1000 {
                return Err(ApiError::validation("note", "Note must be 1000 characters or fewer"));
            }
        }
        Ok(())
    }
}

/// Risk level attached to signals and forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// A health signal derived by the backend (e.g. a pressure drop warning).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub kind: String,
    pub level: RiskLevel,
    pub message: String,
    pub observed_at: DateTime<Utc>,
}

/// A selectable trigger (weather, sleep, stress, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

/// Weather snapshot for a prefecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub prefecture_code: u8,
    pub pressure_hpa: f64,
    #[serde(default)]
    pub pressure_change_hpa: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<f64>,
    pub risk_level: RiskLevel,
    pub forecast_at: DateTime<Utc>,
}

pub fn validate_prefecture_code(code: u8) -> Result<(), ApiError> {
    if (1..=MAX_PREFECTURE_CODE).contains(&code) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "prefecture_code",
            format!("Prefecture code must be between 1 and {MAX_PREFECTURE_CODE}"),
        ))
    }
}

/// Trim, drop empties and duplicates (keeping first occurrence), enforce the cap.
pub fn normalize_concern_topics(topics: &[String]) -> Result<Vec<String>, ApiError> {
    let mut normalized: Vec<String> = Vec::new();
    for topic in topics {
        let topic = topic.trim();
        if !topic.is_empty() && !normalized.iter().any(|t| t == topic) {
            normalized.push(topic.to_string());
        }
    }
    if normalized.len() > MAX_CONCERN_TOPICS {
        return Err(ApiError::validation(
            "concern_topics",
            format!("Select at most {MAX_CONCERN_TOPICS} topics"),
        ));
    }
    Ok(normalized)
}

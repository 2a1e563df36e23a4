//! Onboarding step definitions.

use serde::{Deserialize, Serialize};

/// A unit of onboarding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    /// Home prefecture, drives weather lookups.
    Prefecture,
    /// Health topics the user wants to track.
    ConcernTopics,
    /// Push notification opt-in.
    Notification,
}

impl StepKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefecture => "prefecture",
            Self::ConcernTopics => "concern_topics",
            Self::Notification => "notification",
        }
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StepKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefecture" => Ok(Self::Prefecture),
            "concern_topics" => Ok(Self::ConcernTopics),
            "notification" => Ok(Self::Notification),
            other => Err(format!("Unknown onboarding step: {other}")),
        }
    }
}

/// One entry of the fixed step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub key: StepKey,
    /// Whether the UI should refuse to skip this step. The wizard itself does
    /// not enforce it.
    pub required: bool,
}

impl StepDefinition {
    pub const fn new(key: StepKey, required: bool) -> Self {
        Self { key, required }
    }
}

/// The standard onboarding sequence, in traversal order.
pub fn default_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(StepKey::Prefecture, true),
        StepDefinition::new(StepKey::ConcernTopics, false),
        StepDefinition::new(StepKey::Notification, false),
    ]
}

/// Where the user lands once onboarding is done.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for key in [StepKey::Prefecture, StepKey::ConcernTopics, StepKey::Notification] {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(format!("\"{key}\""), json);
            assert_eq!(key.as_str().parse::<StepKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_step_does_not_parse() {
        assert!("favorite_color".parse::<StepKey>().is_err());
    }

    #[test]
    fn default_steps_order_and_required() {
        let steps = default_steps();
        let keys: Vec<StepKey> = steps.iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![StepKey::Prefecture, StepKey::ConcernTopics, StepKey::Notification]
        );
        assert!(steps[0].required);
        assert!(!steps[1].required);
        assert!(!steps[2].required);
    }
}

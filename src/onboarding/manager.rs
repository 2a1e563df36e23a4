//! OnboardingManager: holds per-user wizards and runs the step actions that
//! persist data before advancing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::push::PushSubscription;

use super::model::{DASHBOARD_ROUTE, StepDefinition, StepKey, default_steps};
use super::state::{OnboardingPhase, WizardAction, WizardState};

/// Per-step view returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub key: StepKey,
    pub required: bool,
    pub completed: bool,
    pub skipped: bool,
}

/// Onboarding status returned by the REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingStatus {
    pub phase: OnboardingPhase,
    pub current_step_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepKey>,
    pub steps: Vec<StepStatus>,
    pub completed_count: usize,
    pub total_steps: usize,
    /// Set once the UI should leave the wizard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl From<&WizardState> for OnboardingStatus {
    fn from(state: &WizardState) -> Self {
        let steps = state
            .steps()
            .iter()
            .map(|def| StepStatus {
                key: def.key,
                required: def.required,
                completed: state.is_step_completed(def.key),
                skipped: state.is_step_skipped(def.key),
            })
            .collect::<Vec<_>>();
        let redirect = (state.phase().is_terminal() || state.is_dismissed())
            .then(|| DASHBOARD_ROUTE.to_string());
        Self {
            phase: state.phase(),
            current_step_index: state.current_step_index(),
            current_step: state.current_step(),
            completed_count: state.completed_count(),
            total_steps: steps.len(),
            steps,
            redirect,
        }
    }
}

#[derive(Debug)]
struct WizardEntry {
    state: WizardState,
    touched_at: DateTime<Utc>,
}

/// Coordinates onboarding wizards across user sessions.
///
/// Wizards live only in memory. Step data is persisted by the backend calls
/// each step makes; the wizard advances only after such a call succeeds.
pub struct OnboardingManager {
    steps: Vec<StepDefinition>,
    wizards: RwLock<HashMap<String, WizardEntry>>,
}

impl Default for OnboardingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingManager {
    pub fn new() -> Self {
        Self::with_steps(default_steps())
    }

    pub fn with_steps(steps: Vec<StepDefinition>) -> Self {
        Self {
            steps,
            wizards: RwLock::new(HashMap::new()),
        }
    }

    /// Id of the signed-in user as confirmed by `GET /users/me`.
    ///
    /// The `user_id` cookie is client-controlled and never used as a wizard key.
    pub async fn authenticated_user(&self, client: &ApiClient<'_>) -> Result<String, ApiError> {
        client.me().await.map(|profile| profile.id)
    }

    /// Return the wizard key for this session, creating the wizard if needed.
    ///
    /// The key is the backend-confirmed user id. New wizards use the same
    /// profile to decide whether the prefecture step is already satisfied.
    pub async fn ensure_wizard(&self, client: &ApiClient<'_>) -> Result<String, ApiError> {
        let profile = client.me().await?;
        let mut wizards = self.wizards.write().await;
        wizards.entry(profile.id.clone()).or_insert_with(|| {
            tracing::info!(
                user_id = %profile.id,
                prefecture_completed = profile.has_prefecture(),
                "Onboarding wizard created"
            );
            WizardEntry {
                state: WizardState::new(self.steps.clone(), profile.has_prefecture()),
                touched_at: Utc::now(),
            }
        });
        Ok(profile.id)
    }

    /// Install a wizard directly (tests, or callers that already know the profile).
    pub async fn insert(&self, user_id: &str, state: WizardState) {
        self.wizards.write().await.insert(
            user_id.to_string(),
            WizardEntry {
                state,
                touched_at: Utc::now(),
            },
        );
    }

    pub async fn status(&self, user_id: &str) -> Option<OnboardingStatus> {
        self.wizards
            .read()
            .await
            .get(user_id)
            .map(|entry| OnboardingStatus::from(&entry.state))
    }

    pub async fn wizard(&self, user_id: &str) -> Option<WizardState> {
        self.wizards
            .read()
            .await
            .get(user_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn len(&self) -> usize {
        self.wizards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.wizards.read().await.is_empty()
    }

    /// Apply a navigation action. Dismissed wizards are discarded.
    pub async fn dispatch(&self, user_id: &str, action: WizardAction) -> Option<OnboardingStatus> {
        let mut wizards = self.wizards.write().await;
        let entry = wizards.get_mut(user_id)?;
        let from = entry.state.phase();
        entry.state.apply(action);
        entry.touched_at = Utc::now();
        let status = OnboardingStatus::from(&entry.state);

        if status.phase != from {
            tracing::info!(user_id, %from, to = %status.phase, "Onboarding phase changed");
        }
        if entry.state.is_dismissed() {
            wizards.remove(user_id);
            tracing::debug!(user_id, "Onboarding wizard discarded");
        }
        Some(status)
    }

    /// Persist the prefecture, then complete its step.
    pub async fn save_prefecture(
        &self,
        client: &ApiClient<'_>,
        user_id: &str,
        prefecture_code: u8,
    ) -> Result<Option<OnboardingStatus>, ApiError> {
        client.update_prefecture(prefecture_code).await?;
        Ok(self
            .dispatch(user_id, WizardAction::CompleteStep(StepKey::Prefecture))
            .await)
    }

    /// Persist concern topics, then complete their step.
    pub async fn save_concern_topics(
        &self,
        client: &ApiClient<'_>,
        user_id: &str,
        topics: &[String],
    ) -> Result<Option<OnboardingStatus>, ApiError> {
        client.update_concern_topics(topics).await?;
        Ok(self
            .dispatch(user_id, WizardAction::CompleteStep(StepKey::ConcernTopics))
            .await)
    }

    /// Register the push subscription, then complete the notification step.
    pub async fn enable_notifications(
        &self,
        client: &ApiClient<'_>,
        user_id: &str,
        subscription: &PushSubscription,
    ) -> Result<Option<OnboardingStatus>, ApiError> {
        client.register_push_subscription(subscription).await?;
        Ok(self
            .dispatch(user_id, WizardAction::CompleteStep(StepKey::Notification))
            .await)
    }

    /// Drop wizards untouched for longer than `max_idle`. Returns how many.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };
        let mut wizards = self.wizards.write().await;
        let before = wizards.len();
        wizards.retain(|_, entry| entry.touched_at >= cutoff);
        let pruned = before - wizards.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle onboarding wizards");
        }
        pruned
    }
}

/// Spawn a background task pruning idle wizards every minute.
pub fn spawn_prune_task(
    manager: Arc<OnboardingManager>,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            manager.prune_idle(max_idle).await;
        }
    })
}

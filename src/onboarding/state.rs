//! Onboarding wizard state machine.
//!
//! Reducer-style: `reduce(state, action) -> state`. Every transition is total;
//! out-of-range indices and unknown keys are no-ops rather than errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{StepDefinition, StepKey};

/// Macro phase of the wizard.
///
/// Welcome → Steps → Complete. `Complete` is entered automatically once every
/// step is complete and the cursor sits on the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingPhase {
    #[default]
    Welcome,
    Steps,
    Complete,
}

impl OnboardingPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingPhase) -> bool {
        use OnboardingPhase::*;
        matches!((self, target), (Welcome, Steps) | (Steps, Complete))
    }

    /// Whether this phase is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for OnboardingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Steps => "steps",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Inputs to the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum WizardAction {
    Start,
    CompleteStep(StepKey),
    SkipStep(StepKey),
    GoBack,
    GoToStep(usize),
    GoToDashboard,
}

/// In-memory wizard state for one user session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    phase: OnboardingPhase,
    steps: Vec<StepDefinition>,
    step_completion: BTreeMap<StepKey, bool>,
    skipped_steps: BTreeMap<StepKey, bool>,
    current_step_index: usize,
    dismissed: bool,
}

impl WizardState {
    /// Build a wizard over `steps` (duplicate keys keep their first position).
    ///
    /// With `prefecture_completed`, the prefecture step starts complete and the
    /// wizard opens directly in `Steps`.
    pub fn new(steps: Vec<StepDefinition>, prefecture_completed: bool) -> Self {
        let mut unique: Vec<StepDefinition> = Vec::with_capacity(steps.len());
        for step in steps {
            if !unique.iter().any(|s| s.key == step.key) {
                unique.push(step);
            }
        }

        let step_completion: BTreeMap<StepKey, bool> =
            unique.iter().map(|s| (s.key, false)).collect();
        let skipped_steps = step_completion.clone();

        let mut state = Self {
            phase: OnboardingPhase::Welcome,
            steps: unique,
            step_completion,
            skipped_steps,
            current_step_index: 0,
            dismissed: false,
        };

        if prefecture_completed {
            if let Some(done) = state.step_completion.get_mut(&StepKey::Prefecture) {
                *done = true;
            }
            state.phase = OnboardingPhase::Steps;
        }
        state.recompute_phase();
        state
    }

    pub fn with_default_steps(prefecture_completed: bool) -> Self {
        Self::new(super::model::default_steps(), prefecture_completed)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn phase(&self) -> OnboardingPhase {
        self.phase
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> Option<StepKey> {
        self.steps.get(self.current_step_index).map(|s| s.key)
    }

    pub fn step_completion(&self) -> &BTreeMap<StepKey, bool> {
        &self.step_completion
    }

    pub fn skipped_steps(&self) -> &BTreeMap<StepKey, bool> {
        &self.skipped_steps
    }

    pub fn is_step_completed(&self, key: StepKey) -> bool {
        self.step_completion.get(&key).copied().unwrap_or(false)
    }

    pub fn is_step_skipped(&self, key: StepKey) -> bool {
        self.skipped_steps.get(&key).copied().unwrap_or(false)
    }

    /// Consult point for the `required` flag. Callers decide whether to honor it.
    pub fn is_skippable(&self, key: StepKey) -> bool {
        self.steps
            .iter()
            .find(|s| s.key == key)
            .map(|s| !s.required)
            .unwrap_or(false)
    }

    pub fn all_completed(&self) -> bool {
        self.step_completion.values().all(|done| *done)
    }

    pub fn completed_count(&self) -> usize {
        self.step_completion.values().filter(|done| **done).count()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index == self.last_index()
    }

    /// Set once the user navigated to the dashboard; the wizard can be dropped.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Apply `action` in place. Returns whether anything changed.
    pub fn apply(&mut self, action: WizardAction) -> bool {
        let before = self.clone();

        match action {
            WizardAction::GoToDashboard => self.dismissed = true,
            _ if self.phase.is_terminal() => {}
            WizardAction::Start => {
                if self.phase.can_transition_to(OnboardingPhase::Steps) {
                    self.phase = OnboardingPhase::Steps;
                }
            }
            WizardAction::CompleteStep(key) => {
                if self.mark_completed(key) {
                    self.advance();
                }
            }
            WizardAction::SkipStep(key) => {
                if self.mark_completed(key) {
                    self.skipped_steps.insert(key, true);
                    self.advance();
                }
            }
            WizardAction::GoBack => {
                self.current_step_index = self.current_step_index.saturating_sub(1);
            }
            WizardAction::GoToStep(index) => {
                let target_done = self
                    .steps
                    .get(index)
                    .map(|s| self.is_step_completed(s.key))
                    .unwrap_or(false);
                if target_done {
                    self.current_step_index = index;
                }
            }
        }

        self.recompute_phase();
        *self != before
    }

    pub fn start(&mut self) -> bool {
        self.apply(WizardAction::Start)
    }

    pub fn complete_step(&mut self, key: StepKey) -> bool {
        self.apply(WizardAction::CompleteStep(key))
    }

    pub fn skip_step(&mut self, key: StepKey) -> bool {
        self.apply(WizardAction::SkipStep(key))
    }

    pub fn go_back(&mut self) -> bool {
        self.apply(WizardAction::GoBack)
    }

    pub fn go_to_step(&mut self, index: usize) -> bool {
        self.apply(WizardAction::GoToStep(index))
    }

    pub fn go_to_dashboard(&mut self) -> bool {
        self.apply(WizardAction::GoToDashboard)
    }

    /// Set completion for a defined key. Entries only ever go false → true.
    fn mark_completed(&mut self, key: StepKey) -> bool {
        match self.step_completion.get_mut(&key) {
            Some(done) => {
                *done = true;
                true
            }
            None => false,
        }
    }

    fn advance(&mut self) {
        if self.current_step_index < self.last_index() {
            self.current_step_index += 1;
        }
    }

    fn recompute_phase(&mut self) {
        if self.phase == OnboardingPhase::Steps && self.all_completed() && self.is_last_step() {
            self.phase = OnboardingPhase::Complete;
        }
    }
}

/// Pure reducer form of [`WizardState::apply`].
pub fn reduce(state: &WizardState, action: WizardAction) -> WizardState {
    let mut next = state.clone();
    next.apply(action);
    next
}

//! Onboarding wizard for the first-launch setup flow.
//!
//! A linear, skippable sequence of steps (prefecture, concern topics,
//! notifications). The wizard state machine is framework-free; the manager
//! keeps one wizard per signed-in user and the routes expose it over REST.

pub mod manager;
pub mod model;
pub mod routes;
pub mod state;

pub use manager::{OnboardingManager, OnboardingStatus, StepStatus, spawn_prune_task};
pub use model::{DASHBOARD_ROUTE, StepDefinition, StepKey, default_steps};
pub use routes::onboarding_routes;
pub use state::{OnboardingPhase, WizardAction, WizardState, reduce};

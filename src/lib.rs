//! Health companion BFF: session handling, authenticated backend access,
//! and the onboarding wizard.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod push;
pub mod session;
pub mod web;

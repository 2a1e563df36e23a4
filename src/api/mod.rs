//! Backend API access.
//!
//! - `pipeline`: bearer auth with a single refresh-and-retry on 401
//! - `refresh`: the refresh endpoint collaborator
//! - `client`: typed endpoints (users, daily logs, signals, triggers, weather, push)
//! - `model`: request/response types

pub mod client;
pub mod model;
pub mod pipeline;
pub mod refresh;

pub use client::{ApiClient, USER_ID_HEADER};
pub use pipeline::{
    ApiRequest, AuthenticatedRequestPipeline, ExecuteOptions, ExecutionPath, PipelineResponse,
};
pub use refresh::{HttpRefreshEndpoint, RefreshEndpoint, RefreshFailure, RefreshedTokens};

use anyhow::Context;

use health_companion::api::AuthenticatedRequestPipeline;
use health_companion::config::AppConfig;
use health_companion::onboarding::{OnboardingManager, spawn_prune_task};
use health_companion::web::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let pipeline =
        AuthenticatedRequestPipeline::from_config(&config).context("Failed to build API client")?;

    eprintln!("🩺 Health Companion v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);
    eprintln!("   Listening: http://{}", config.bind_addr);
    eprintln!(
        "   Cookies: {}",
        if config.cookie_secure { "secure" } else { "insecure (development)" }
    );

    let bind_addr = config.bind_addr.clone();
    let idle_timeout = config.onboarding_idle_timeout;
    let state = AppState::new(config, pipeline, OnboardingManager::new());

    let _prune_handle = spawn_prune_task(state.onboarding.clone(), idle_timeout);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}

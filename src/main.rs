use anyhow::{Context, Result};
use leaf_analyzer::{router, AppConfig, AppState, GeminiClient, ViewController};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leaf_analyzer=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!("Starting with {:?}", config);

    let client = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.gemini_api_key,
    ));
    let controller = ViewController::new(client);

    // Recorded in the UI state; the page shows it and uploads still work.
    if let Err(e) = controller.bootstrap(&config.bootstrap_image).await {
        warn!("Starting without default example: {}", e);
    }

    let app = router(Arc::new(AppState { controller }));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("🍃 Server running on http://{}", config.bind_addr);
    info!("📸 Open in your browser and upload a leaf photo");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

//! Face Age Estimation Service
//!
//! Upload a photo in the browser, get every face boxed and labelled with an
//! age range. Inference runs on OpenVINO.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use agecam::api::{create_rest_router, AppState};
use agecam::config::Config;
use agecam::engine::ModelPool;
use agecam::service::AgeService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting Age Estimation Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load(Config::default_path()).unwrap_or_else(|e| {
        info!("Using default config ({})", e);
        Config::default()
    });

    info!("Configuration loaded:");
    info!("  Listen: {}", config.server.bind_addr());
    info!("  Device: {}", config.inference.device);
    info!("  Confidence threshold: {}", config.pipeline.confidence_threshold);
    info!("  Face margin: {}px", config.pipeline.face_margin);

    let pool = Arc::new(ModelPool::new(&config));

    // Load models up front; on failure keep serving and report it per request
    let warm_pool = pool.clone();
    match tokio::task::spawn_blocking(move || warm_pool.get_models().map(|_| ())).await? {
        Ok(()) => info!("Models ready"),
        Err(e) => {
            error!("Error loading models: {}", e);
            error!("Make sure all model files are present at the configured paths.");
        }
    }

    let service = Arc::new(AgeService::new(pool, config.pipeline.clone()));

    let app_state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let router = create_rest_router(app_state, config.server.max_upload_bytes());

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Age Estimation Service listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Goodbye!");
    Ok(())
}

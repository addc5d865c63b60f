//! Study Timer - A state-managed HTTP server for persistent study session timers
//!
//! This is the main entry point for the study-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use study_timer::{
    config::Config,
    state::AppState,
    store::SledStore,
    api::create_router,
    tasks::activity_check_task,
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("study_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting study-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_dir={}",
          config.host, config.port, config.data_dir.display());

    // Open the durable timer store (created on first run)
    let store = Arc::new(SledStore::open(&config.data_dir)?);

    // Create application state
    let state = Arc::new(AppState::new(
        store,
        Arc::new(SystemClock),
        config.port,
        config.host.clone(),
    ));

    // Start the advisory activity check background task
    let activity_state = Arc::clone(&state);
    let activity_interval = config.activity_check_interval;
    tokio::spawn(async move {
        activity_check_task(activity_state, activity_interval).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /sessions/:id/attach - Attach a session timer");
    info!("  POST   /sessions/:id/start  - Start or resume the timer");
    info!("  POST   /sessions/:id/pause  - Pause the timer");
    info!("  POST   /sessions/:id/reset  - Reset the timer and its record");
    info!("  DELETE /sessions/:id        - Reset and detach the session");
    info!("  GET    /sessions/:id/status - Timer status and progress");
    info!("  GET    /status              - Server status");
    info!("  GET    /health              - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

// Outcome Settlement Engine - Main Entry Point
// Signed requests in, atomic market transitions out

use outcome_settlement::routes::ENDPOINTS;
use outcome_settlement::{router, AppState, Config, SharedState};
use std::net::SocketAddr;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    config.init_logging();

    info!("═══════════════════════════════════════════════");
    info!("     🎲 Binary Outcome Settlement Engine");
    info!("═══════════════════════════════════════════════");

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(bind_addr = %config.bind_addr, error = %e, "❌ invalid BIND_ADDR");
            std::process::exit(1);
        }
    };

    let state: SharedState = match AppState::new(config) {
        Ok(state) => state.shared(),
        Err(e) => {
            error!(error = %e, "❌ failed to initialize state");
            std::process::exit(1);
        }
    };

    // Clone state for shutdown handler before moving into router
    let shutdown_state = state.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind listener");

    info!("🚀 server running on http://{}", addr);
    for (method, path, what) in ENDPOINTS {
        info!("   {:<5} {:<32} {}", method, path, what);
    }

    tokio::spawn(async move {
        shutdown_signal().await;

        info!("🛑 shutdown signal received, saving state...");
        match shutdown_state.lock() {
            Ok(app_state) => {
                if let Err(e) = app_state.save_to_disk() {
                    error!(error = %e, "❌ failed to save state");
                }
            }
            Err(_) => error!("❌ state lock poisoned, not saving"),
        }

        info!("👋 goodbye");
        std::process::exit(0);
    });

    axum::serve(listener, app).await.expect("server error");
}

/// Resolves on Ctrl-C, or on SIGTERM where there is one
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! Razorpay Payment Testing Console
//!
//! Axum server that drives order and subscription payment flows against
//! the delivery backend. The page at `/` opens Razorpay's checkout widget
//! with the options this server hands out and posts the widget's result
//! back for verification.

mod handlers;
mod routes;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::ConsoleConfig;

use crate::routes::router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ConsoleConfig::from_env();
    match config.validate() {
        Ok(()) => tracing::info!("✓ Backend: {}", config.api_base_url),
        Err(e) => tracing::warn!("⚠ {e} - set API_BASE_URL or update it from the console"),
    }
    if config.razorpay_key_id.is_empty() {
        tracing::warn!("⚠ RAZORPAY_KEY_ID not set - checkout will refuse to open");
    }
    if config.auth_token.is_empty() {
        tracing::warn!("⚠ AUTH_TOKEN not set - backend calls will be unauthenticated");
    }

    let state = AppState::new(config);

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into());
    let app = router(state, &static_dir);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("💳 payment console running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /api/config                  - Show settings");
    tracing::info!("  POST /api/orders                  - Create order + checkout");
    tracing::info!("  POST /api/subscriptions/{{action}}  - purchase | topup | upgrade | renew");
    tracing::info!("  POST /api/checkout/complete       - Widget payment callback");
    tracing::info!("  POST /api/verify/{{purpose}}        - Verify a receipt directly");
    tracing::info!("  GET  /api/attempts                - Payment details");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

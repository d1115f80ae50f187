//! billing-server: marketplace usage metering and billing
//!
//! - Receives order status changes and records commission
//! - Answers limit checks and usage queries
//! - Generates monthly invoices (on demand and on a schedule)

use billing_server::billing::seed_default_plans;
use billing_server::common::init_logger;
use billing_server::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        "Starting billing-server {} (env: {})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let state = AppState::new(&config).await?;

    if config.seed_plans {
        let inserted = seed_default_plans(state.store.as_ref()).await?;
        tracing::info!(inserted, "Plan catalog seeded");
    }

    if config.invoice_scheduler_enabled {
        state.invoice_scheduler(&config).spawn();
    } else {
        tracing::info!("Invoice scheduler disabled");
    }

    let app = api::build_app(state);
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("billing-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("billing-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

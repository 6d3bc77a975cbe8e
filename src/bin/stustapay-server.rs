use std::sync::Arc;

use stustapay_core::db::Database;
use stustapay_core::gateway;
use stustapay_core::payout::SepaConfig;
use stustapay_core::CoreConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: stustapay-server <config.yaml>"))?;
    let config = CoreConfig::load(&config_path)?;

    let _logging_guard = stustapay_core::logging::init_logging(&config.logging);
    tracing::info!(bind_address = %config.server.bind_address, "starting stustapay-core");

    let db = Database::connect(&config.database.url, config.database.pool_size).await?;
    db.health_check().await?;

    let sepa_config = SepaConfig {
        sender_iban: config.sepa.sender_iban.clone(),
        sender_name: config.sepa.sender_name.clone(),
        description_template: config.sepa.description_template.clone(),
        currency: config.sepa.currency.clone(),
    };
    let state = Arc::new(gateway::AppState::new(db.pool().clone(), sepa_config));
    let app = gateway::router((*state).clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(bind_address = %config.server.bind_address, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

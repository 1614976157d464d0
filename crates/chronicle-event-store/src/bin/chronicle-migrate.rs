//! Creates the Chronicle event store schema in the configured database.

use std::error::Error;

use chronicle_event_store::config::PgStoreConfig;
use chronicle_event_store::schema;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = PgStoreConfig::from_env()?;
    tracing::info!(
        max_connections = config.max_connections,
        "Connecting to event store database"
    );
    let pool = config.connect().await?;

    schema::migrate(&pool).await?;
    tracing::info!("Event store schema migrated");

    pool.close().await;
    Ok(())
}

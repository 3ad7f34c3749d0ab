//! Database helpers.
//!
//! Connects the application pool and applies the bundled migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::AppConfig;

/// Type alias for the application database pool.
pub type AppDb = PgPool;

/// Connect to the coupon database and bring its schema up to date.
pub async fn connect(config: &AppConfig) -> anyhow::Result<AppDb> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to application database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Application migrations complete");

    Ok(pool)
}

//! # Coupon Admin
//!
//! Embedded admin service for managing a shop's discount coupons.
//!
//! ## Architecture
//!
//! - Axum handles HTTP routing and request/response lifecycle
//! - SQLx stores coupons in Postgres, scoped per shop
//! - The Shopify Admin GraphQL API mirrors each coupon as a code app discount
//! - The `coupon-discount` binary applies the discount at checkout

use std::sync::Arc;

use tracing::info;

use coupon_admin::config::AppConfig;
use coupon_admin::shopify::{SharedGateway, ShopifyAdminClient};
use coupon_admin::store::{PgCouponStore, SharedStore};
use coupon_admin::{create_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coupon_admin=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting coupon admin");

    let config = AppConfig::from_env();
    let pool = db::connect(&config).await?;
    let store: SharedStore = Arc::new(PgCouponStore::new(pool));

    let mut client = ShopifyAdminClient::new(config.shopify_api_version.clone());
    if let Some(base_url) = &config.shopify_admin_base_url {
        info!("Sending Admin API calls to {}", base_url);
        client = client.with_base_url(base_url.clone());
    }
    let gateway: SharedGateway = Arc::new(client);

    let app = create_app(store, gateway);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

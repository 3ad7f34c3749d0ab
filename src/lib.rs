//! # Coupon Admin Library
//!
//! Exposes the Axum router and modules so integration tests can create
//! an in-process server against an in-memory store and a fake discount
//! gateway, and so the checkout function binary can reuse the discount rule.

pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod format;
pub mod models;
pub mod query;
pub mod routes;
pub mod session;
pub mod shopify;
pub mod status;
pub mod store;
pub mod sync;
pub mod validation;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::shopify::SharedGateway;
use crate::store::SharedStore;

/// Build the Axum router with all route modules and middleware.
///
/// The caller provides the coupon store and the platform discount gateway.
/// This function does NOT start a server or connect to a database.
pub fn create_app(store: SharedStore, gateway: SharedGateway) -> Router {
    Router::new()
        .merge(routes::coupons::router())
        .layer(Extension(store))
        .layer(Extension(gateway))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

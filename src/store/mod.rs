//! Coupon persistence.
//!
//! Every operation is scoped to a shop, either through an explicit `shop`
//! argument or through a filter built on `Filter::shop`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::filter::Filter;
use crate::models::{Coupon, ValidatedCoupon};
use crate::query::OrderBy;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgCouponStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. `field` names the form field.
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Shared handle injected into route handlers.
pub type SharedStore = Arc<dyn CouponStore>;

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_many(
        &self,
        filter: &Filter,
        order_by: OrderBy,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Coupon>>;

    async fn count(&self, filter: &Filter) -> Result<i64>;

    async fn find_first(&self, filter: &Filter) -> Result<Option<Coupon>>;

    async fn create(&self, shop: &str, coupon: &ValidatedCoupon) -> Result<Coupon>;

    async fn update(&self, shop: &str, id: i32, coupon: &ValidatedCoupon) -> Result<Coupon>;

    async fn set_active(&self, shop: &str, id: i32, is_active: bool) -> Result<()>;

    async fn set_shopify_discount_id(&self, shop: &str, id: i32, discount_id: &str)
        -> Result<()>;

    async fn delete(&self, shop: &str, id: i32) -> Result<()>;

    /// Delete every row matching `filter` and return how many were removed.
    async fn delete_many(&self, filter: &Filter) -> Result<u64>;
}

/// Filter for a single coupon owned by `shop`.
pub fn owned_by(shop: &str, id: i32) -> Filter {
    Filter::And(vec![Filter::shop(shop), Filter::eq(crate::filter::Column::Id, id)])
}

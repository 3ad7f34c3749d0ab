//! In-process coupon store.
//!
//! Evaluates filters with `Filter::matches` and enforces the same
//! `(shop, code)` uniqueness as the database. Used by tests and local runs
//! without PostgreSQL.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CouponStore, Result, StoreError};
use crate::filter::Filter;
use crate::models::{Coupon, ValidatedCoupon};
use crate::query::{OrderBy, SortDirection, SortField};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    coupons: Vec<Coupon>,
}

impl Inner {
    fn code_taken(&self, shop: &str, code: &str, except_id: Option<i32>) -> bool {
        self.coupons
            .iter()
            .any(|c| c.shop == shop && c.code == code && Some(c.id) != except_id)
    }

    fn get_mut(&mut self, shop: &str, id: i32) -> Result<&mut Coupon> {
        self.coupons
            .iter_mut()
            .find(|c| c.id == id && c.shop == shop)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed row as-is, assigning an id when `coupon.id` is 0.
    pub async fn insert(&self, mut coupon: Coupon) -> Coupon {
        let mut inner = self.inner.write().await;
        if coupon.id == 0 {
            inner.next_id += 1;
            coupon.id = inner.next_id;
        } else {
            inner.next_id = inner.next_id.max(coupon.id);
        }
        inner.coupons.push(coupon.clone());
        coupon
    }

    /// Snapshot of every stored row, across all shops.
    pub async fn all(&self) -> Vec<Coupon> {
        self.inner.read().await.coupons.clone()
    }
}

fn compare(a: &Coupon, b: &Coupon, field: SortField) -> Ordering {
    match field {
        SortField::Code => a.code.cmp(&b.code),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::DiscountValue => a.discount_value.total_cmp(&b.discount_value),
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_many(
        &self,
        filter: &Filter,
        order_by: OrderBy,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Coupon>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Coupon> = inner
            .coupons
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let ordering = compare(a, b, order_by.field);
            match order_by.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<i64> {
        let inner = self.inner.read().await;
        let count = inner.coupons.iter().filter(|c| filter.matches(c)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn find_first(&self, filter: &Filter) -> Result<Option<Coupon>> {
        let inner = self.inner.read().await;
        Ok(inner.coupons.iter().find(|c| filter.matches(c)).cloned())
    }

    async fn create(&self, shop: &str, coupon: &ValidatedCoupon) -> Result<Coupon> {
        let mut inner = self.inner.write().await;
        if inner.code_taken(shop, &coupon.code, None) {
            return Err(StoreError::UniqueViolation { field: "code" });
        }
        inner.next_id += 1;
        let now = Utc::now();
        let row = Coupon {
            id: inner.next_id,
            shop: shop.to_string(),
            title: coupon.title.clone(),
            code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            minimum_purchase: coupon.minimum_purchase,
            usage_limit: coupon.usage_limit,
            usage_count: 0,
            starts_at: coupon.starts_at,
            ends_at: coupon.ends_at,
            is_active: true,
            shopify_discount_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.coupons.push(row.clone());
        Ok(row)
    }

    async fn update(&self, shop: &str, id: i32, coupon: &ValidatedCoupon) -> Result<Coupon> {
        let mut inner = self.inner.write().await;
        if inner.code_taken(shop, &coupon.code, Some(id)) {
            return Err(StoreError::UniqueViolation { field: "code" });
        }
        let row = inner.get_mut(shop, id)?;
        row.title = coupon.title.clone();
        row.code = coupon.code.clone();
        row.discount_type = coupon.discount_type;
        row.discount_value = coupon.discount_value;
        row.minimum_purchase = coupon.minimum_purchase;
        row.usage_limit = coupon.usage_limit;
        row.starts_at = coupon.starts_at;
        row.ends_at = coupon.ends_at;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn set_active(&self, shop: &str, id: i32, is_active: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        let row = inner.get_mut(shop, id)?;
        row.is_active = is_active;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn set_shopify_discount_id(
        &self,
        shop: &str,
        id: i32,
        discount_id: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let row = inner.get_mut(shop, id)?;
        row.shopify_discount_id = Some(discount_id.to_string());
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, shop: &str, id: i32) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.coupons.retain(|c| !(c.id == id && c.shop == shop));
        Ok(())
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.coupons.len();
        inner.coupons.retain(|c| !filter.matches(c));
        Ok((before - inner.coupons.len()) as u64)
    }
}

//! PostgreSQL coupon store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{CouponStore, Result, StoreError};
use crate::filter::Filter;
use crate::models::{Coupon, ValidatedCoupon};
use crate::query::OrderBy;

pub struct PgCouponStore {
    pool: PgPool,
}

impl PgCouponStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Remap the `(shop, code)` unique constraint to a field-level conflict.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation { field: "code" };
        }
    }
    StoreError::Database(err)
}

fn where_clause<'a>(sql: &str, filter: &Filter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(sql);
    qb.push(" WHERE ");
    filter.push_sql(&mut qb);
    qb
}

/// One ordered page of matching rows.
fn page_query<'a>(
    filter: &Filter,
    order_by: OrderBy,
    offset: i64,
    limit: i64,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = where_clause("SELECT * FROM coupons", filter);
    qb.push(" ORDER BY ")
        .push(order_by.field.sql_name())
        .push(" ")
        .push(order_by.direction.sql());
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    qb
}

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn find_many(
        &self,
        filter: &Filter,
        order_by: OrderBy,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Coupon>> {
        let mut qb = page_query(filter, order_by, offset, limit);
        Ok(qb.build_query_as::<Coupon>().fetch_all(&self.pool).await?)
    }

    async fn count(&self, filter: &Filter) -> Result<i64> {
        let mut qb = where_clause("SELECT COUNT(*) FROM coupons", filter);
        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn find_first(&self, filter: &Filter) -> Result<Option<Coupon>> {
        let mut qb = where_clause("SELECT * FROM coupons", filter);
        qb.push(" LIMIT 1");
        Ok(qb.build_query_as::<Coupon>().fetch_optional(&self.pool).await?)
    }

    async fn create(&self, shop: &str, coupon: &ValidatedCoupon) -> Result<Coupon> {
        sqlx::query_as(
            r#"
            INSERT INTO coupons
                (shop, title, code, discount_type, discount_value, minimum_purchase,
                 usage_limit, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(shop)
        .bind(&coupon.title)
        .bind(&coupon.code)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value)
        .bind(coupon.minimum_purchase)
        .bind(coupon.usage_limit)
        .bind(coupon.starts_at)
        .bind(coupon.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, shop: &str, id: i32, coupon: &ValidatedCoupon) -> Result<Coupon> {
        sqlx::query_as(
            r#"
            UPDATE coupons
            SET title = $3, code = $4, discount_type = $5, discount_value = $6,
                minimum_purchase = $7, usage_limit = $8, starts_at = $9, ends_at = $10,
                updated_at = NOW()
            WHERE id = $1 AND shop = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(shop)
        .bind(&coupon.title)
        .bind(&coupon.code)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value)
        .bind(coupon.minimum_purchase)
        .bind(coupon.usage_limit)
        .bind(coupon.starts_at)
        .bind(coupon.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn set_active(&self, shop: &str, id: i32, is_active: bool) -> Result<()> {
        sqlx::query(
            "UPDATE coupons SET is_active = $3, updated_at = NOW() WHERE id = $1 AND shop = $2",
        )
        .bind(id)
        .bind(shop)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_shopify_discount_id(
        &self,
        shop: &str,
        id: i32,
        discount_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE coupons SET shopify_discount_id = $3, updated_at = NOW() \
             WHERE id = $1 AND shop = $2",
        )
        .bind(id)
        .bind(shop)
        .bind(discount_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, shop: &str, id: i32) -> Result<()> {
        sqlx::query("DELETE FROM coupons WHERE id = $1 AND shop = $2")
            .bind(id)
            .bind(shop)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64> {
        let mut qb = where_clause("DELETE FROM coupons", filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Column, Value};
    use crate::query::{SortDirection, SortField};
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[test]
    fn test_page_query_orders_then_limits() {
        let filter = Filter::and(vec![
            Filter::shop("shop.test"),
            Filter::In(Column::Id, vec![Value::Int(1), Value::Int(2)]),
        ]);
        let order_by = OrderBy {
            field: SortField::DiscountValue,
            direction: SortDirection::Asc,
        };
        let qb = page_query(&filter, order_by, 20, 10);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM coupons WHERE (shop = $1) AND (id IN ($2, $3)) \
             ORDER BY discount_value ASC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_page_query_default_order() {
        let qb = page_query(&Filter::shop("shop.test"), OrderBy::default(), 0, 10);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM coupons WHERE shop = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_count_and_delete_share_the_filter() {
        let filter = Filter::shop("shop.test");
        assert_eq!(
            where_clause("SELECT COUNT(*) FROM coupons", &filter).sql(),
            "SELECT COUNT(*) FROM coupons WHERE shop = $1"
        );
        assert_eq!(
            where_clause("DELETE FROM coupons", &filter).sql(),
            "DELETE FROM coupons WHERE shop = $1"
        );
    }

    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            None
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn test_unique_violation_becomes_code_conflict() {
        let err = map_write_error(sqlx::Error::Database(Box::new(FakeDbError(
            ErrorKind::UniqueViolation,
        ))));
        assert!(matches!(err, StoreError::UniqueViolation { field: "code" }));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = map_write_error(sqlx::Error::Database(Box::new(FakeDbError(ErrorKind::Other))));
        assert!(matches!(err, StoreError::Database(_)));

        let err = map_write_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}

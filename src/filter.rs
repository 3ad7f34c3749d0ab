//! Structured coupon filter predicates.
//!
//! A `Filter` is built once and then either rendered into SQL for the Postgres
//! store or evaluated directly against in-memory rows. Both paths follow SQL
//! null semantics: a comparison against a missing value never matches.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::Coupon;

/// Coupon columns a filter may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Shop,
    Code,
    Title,
    DiscountType,
    IsActive,
    StartsAt,
    EndsAt,
}

impl Column {
    pub fn sql_name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Shop => "shop",
            Column::Code => "code",
            Column::Title => "title",
            Column::DiscountType => "discount_type",
            Column::IsActive => "is_active",
            Column::StartsAt => "starts_at",
            Column::EndsAt => "ends_at",
        }
    }

    fn value_of(self, coupon: &Coupon) -> Option<Value> {
        match self {
            Column::Id => Some(Value::Int(coupon.id)),
            Column::Shop => Some(Value::Text(coupon.shop.clone())),
            Column::Code => Some(Value::Text(coupon.code.clone())),
            Column::Title => Some(Value::Text(coupon.title.clone())),
            Column::DiscountType => Some(Value::Text(coupon.discount_type.as_str().to_string())),
            Column::IsActive => Some(Value::Bool(coupon.is_active)),
            Column::StartsAt => Some(Value::Timestamp(coupon.starts_at)),
            Column::EndsAt => coupon.ends_at.map(Value::Timestamp),
        }
    }
}

/// A literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Value::Int(v) => qb.push_bind(*v),
            Value::Text(v) => qb.push_bind(v.clone()),
            Value::Bool(v) => qb.push_bind(*v),
            Value::Timestamp(v) => qb.push_bind(*v),
        };
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    fn sql(self) -> &'static str {
        match self {
            CmpOp::Lt => " < ",
            CmpOp::Lte => " <= ",
            CmpOp::Gt => " > ",
            CmpOp::Gte => " >= ",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Lte => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Gte => ordering != Ordering::Less,
        }
    }
}

/// A boolean predicate over coupon rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Column, Value),
    /// Case-sensitive substring match.
    Contains(Column, String),
    Compare(Column, CmpOp, Value),
    IsNull(Column),
    IsNotNull(Column),
    In(Column, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn compare(column: Column, op: CmpOp, value: impl Into<Value>) -> Self {
        Filter::Compare(column, op, value.into())
    }

    /// Tenant scope: `shop = <shop>`.
    pub fn shop(shop: &str) -> Self {
        Filter::eq(Column::Shop, shop)
    }

    /// Conjunction that collapses to its only member when given one condition.
    pub fn and(mut conditions: Vec<Filter>) -> Self {
        if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Filter::And(conditions)
        }
    }

    /// Disjunction that collapses to its only member when given one condition.
    pub fn or(mut conditions: Vec<Filter>) -> Self {
        if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Filter::Or(conditions)
        }
    }

    /// Evaluate the predicate against a single row.
    pub fn matches(&self, coupon: &Coupon) -> bool {
        match self {
            Filter::Eq(column, value) => column.value_of(coupon).as_ref() == Some(value),
            Filter::Contains(column, needle) => match column.value_of(coupon) {
                Some(Value::Text(haystack)) => haystack.contains(needle.as_str()),
                _ => false,
            },
            Filter::Compare(column, op, value) => column
                .value_of(coupon)
                .and_then(|actual| actual.partial_cmp_value(value))
                .is_some_and(|ordering| op.holds(ordering)),
            Filter::IsNull(column) => column.value_of(coupon).is_none(),
            Filter::IsNotNull(column) => column.value_of(coupon).is_some(),
            Filter::In(column, values) => column
                .value_of(coupon)
                .is_some_and(|actual| values.contains(&actual)),
            Filter::And(conditions) => conditions.iter().all(|c| c.matches(coupon)),
            Filter::Or(conditions) => conditions.iter().any(|c| c.matches(coupon)),
        }
    }

    /// Append this predicate to a SQL query as a parenthesized expression.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Filter::Eq(column, value) => {
                qb.push(column.sql_name()).push(" = ");
                value.push_bind(qb);
            }
            Filter::Contains(column, needle) => {
                qb.push("strpos(").push(column.sql_name()).push(", ");
                qb.push_bind(needle.clone());
                qb.push(") > 0");
            }
            Filter::Compare(column, op, value) => {
                qb.push(column.sql_name()).push(op.sql());
                value.push_bind(qb);
            }
            Filter::IsNull(column) => {
                qb.push(column.sql_name()).push(" IS NULL");
            }
            Filter::IsNotNull(column) => {
                qb.push(column.sql_name()).push(" IS NOT NULL");
            }
            Filter::In(column, values) => {
                if values.is_empty() {
                    qb.push("FALSE");
                    return;
                }
                qb.push(column.sql_name()).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    value.push_bind(qb);
                }
                qb.push(")");
            }
            Filter::And(conditions) => push_joined(qb, conditions, " AND ", "TRUE"),
            Filter::Or(conditions) => push_joined(qb, conditions, " OR ", "FALSE"),
        }
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'_, Postgres>,
    conditions: &[Filter],
    separator: &str,
    empty: &str,
) {
    if conditions.is_empty() {
        qb.push(empty);
        return;
    }
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        qb.push("(");
        condition.push_sql(qb);
        qb.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;
    use chrono::TimeZone;

    fn coupon() -> Coupon {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Coupon {
            id: 7,
            shop: "shop.test".into(),
            title: "Summer Sale".into(),
            code: "SUMMER25".into(),
            discount_type: DiscountType::Percentage,
            discount_value: 25.0,
            minimum_purchase: None,
            usage_limit: None,
            usage_count: 0,
            starts_at: ts,
            ends_at: None,
            is_active: true,
            shopify_discount_id: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_and_collapses_single_condition() {
        assert_eq!(Filter::and(vec![Filter::shop("a")]), Filter::shop("a"));
        assert!(matches!(
            Filter::and(vec![Filter::shop("a"), Filter::shop("b")]),
            Filter::And(_)
        ));
    }

    #[test]
    fn test_null_column_never_compares() {
        let c = coupon();
        let now = Utc::now();
        assert!(!Filter::compare(Column::EndsAt, CmpOp::Lt, now).matches(&c));
        assert!(!Filter::compare(Column::EndsAt, CmpOp::Gte, now).matches(&c));
        assert!(Filter::IsNull(Column::EndsAt).matches(&c));
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let c = coupon();
        assert!(Filter::Contains(Column::Code, "MER".into()).matches(&c));
        assert!(!Filter::Contains(Column::Code, "mer".into()).matches(&c));
        assert!(Filter::Contains(Column::Title, "Sale".into()).matches(&c));
    }

    #[test]
    fn test_in_matches_discount_type_text() {
        let c = coupon();
        let f = Filter::In(Column::DiscountType, vec!["percentage".into()]);
        assert!(f.matches(&c));
        let f = Filter::In(Column::DiscountType, vec!["fixed_amount".into()]);
        assert!(!f.matches(&c));
    }

    #[test]
    fn test_push_sql_renders_bound_parameters() {
        let filter = Filter::and(vec![
            Filter::shop("shop.test"),
            Filter::Or(vec![
                Filter::Contains(Column::Code, "SUM".into()),
                Filter::Contains(Column::Title, "SUM".into()),
            ]),
            Filter::In(
                Column::DiscountType,
                vec!["percentage".into(), "fixed_amount".into()],
            ),
        ]);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM coupons WHERE ");
        filter.push_sql(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM coupons WHERE (shop = $1) AND \
             ((strpos(code, $2) > 0) OR (strpos(title, $3) > 0)) AND \
             (discount_type IN ($4, $5))"
        );
    }
}

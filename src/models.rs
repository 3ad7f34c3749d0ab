//! Domain models for the coupon admin application.
//!
//! `Coupon` maps to the `coupons` table. Every row belongs to exactly one shop,
//! and `shopify_discount_id` links it to the platform discount it is mirrored to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::Status;

// ============================================================================
// Enumerations
// ============================================================================

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    pub const ALL: [DiscountType; 2] = [DiscountType::Percentage, DiscountType::FixedAmount];

    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixed_amount",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown discount type: {0}")]
pub struct ParseDiscountTypeError(pub String);

impl FromStr for DiscountType {
    type Err = ParseDiscountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed_amount" => Ok(DiscountType::FixedAmount),
            other => Err(ParseDiscountTypeError(other.to_string())),
        }
    }
}

impl TryFrom<String> for DiscountType {
    type Error = ParseDiscountTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Database Models (sqlx::FromRow)
// ============================================================================

/// A discount coupon owned by a shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i32,
    pub shop: String,
    pub title: String,
    pub code: String,
    #[sqlx(try_from = "String")]
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub minimum_purchase: Option<f64>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub shopify_discount_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Coupon fields that passed validation, ready to be written.
///
/// Excludes everything the form does not control: id, shop, usage count,
/// activation flag and the external discount reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCoupon {
    pub title: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub minimum_purchase: Option<f64>,
    pub usage_limit: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<&Coupon> for ValidatedCoupon {
    fn from(coupon: &Coupon) -> Self {
        Self {
            title: coupon.title.clone(),
            code: coupon.code.clone(),
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            minimum_purchase: coupon.minimum_purchase,
            usage_limit: coupon.usage_limit,
            starts_at: coupon.starts_at,
            ends_at: coupon.ends_at,
        }
    }
}

// ============================================================================
// Request Models
// ============================================================================

/// Raw coupon form input, exactly as submitted. Missing fields are blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponFormData {
    pub title: String,
    pub code: String,
    pub discount_type: String,
    pub discount_value: String,
    pub minimum_purchase: String,
    pub usage_limit: String,
    pub starts_at: String,
    pub ends_at: String,
}

// ============================================================================
// Response Models
// ============================================================================

/// A coupon row as shown in the list, with its derived status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponListItem {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub status: Status,
    pub discount_label: String,
}

/// Response for the coupon list endpoint. Echoes the canonical filter state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponListResponse {
    pub coupons: Vec<CouponListItem>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
    pub search: String,
    pub status: Vec<Status>,
    pub discount_type: Vec<DiscountType>,
    pub sort: crate::query::SortField,
    pub direction: crate::query::SortDirection,
}

/// Response for a single coupon.
#[derive(Debug, Serialize)]
pub struct CouponResponse {
    pub coupon: Coupon,
}

/// Response for a toggle action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub is_active: bool,
}

/// Response for a bulk delete action.
#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_type_round_trips_through_str() {
        for ty in DiscountType::ALL {
            assert_eq!(ty.as_str().parse::<DiscountType>(), Ok(ty));
        }
        assert!("bogo".parse::<DiscountType>().is_err());
    }

    #[test]
    fn test_form_data_defaults_missing_fields_to_blank() {
        let form: CouponFormData =
            serde_json::from_value(serde_json::json!({ "title": "Summer" })).unwrap();
        assert_eq!(form.title, "Summer");
        assert_eq!(form.ends_at, "");
    }
}

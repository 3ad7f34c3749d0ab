//! Display helpers for coupon values.

use crate::models::DiscountType;

/// Human-readable discount amount, e.g. `25%` or `$8.99`.
pub fn format_discount(discount_type: DiscountType, value: f64) -> String {
    match discount_type {
        DiscountType::Percentage => format!("{}%", value),
        DiscountType::FixedAmount => format!("${:.2}", value),
    }
}

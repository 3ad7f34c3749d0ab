//! Coupon form validation.
//!
//! Every field is checked independently and all failures are collected into a
//! single `FieldErrors` map, so the form can show every problem at once.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::{CouponFormData, DiscountType, ValidatedCoupon};
use crate::query::RawParams;

pub const TITLE_MAX_LEN: usize = 255;
pub const CODE_MIN_LEN: usize = 3;
pub const CODE_MAX_LEN: usize = 50;

/// Field name → message, keyed by the form field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl CouponFormData {
    /// Read the eight coupon fields from submitted form pairs.
    pub fn from_params(params: &RawParams) -> Self {
        let field = |name: &str| params.get(name).unwrap_or_default().to_string();
        Self {
            title: field("title"),
            code: field("code"),
            discount_type: field("discountType"),
            discount_value: field("discountValue"),
            minimum_purchase: field("minimumPurchase"),
            usage_limit: field("usageLimit"),
            starts_at: field("startsAt"),
            ends_at: field("endsAt"),
        }
    }
}

/// Validate and normalize raw form input.
pub fn validate_coupon_form(raw: &CouponFormData) -> Result<ValidatedCoupon, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = raw.title.trim();
    if title.is_empty() {
        errors.insert("title", "Title is required");
    } else if title.chars().count() > TITLE_MAX_LEN {
        errors.insert("title", "Title must be 255 characters or less");
    }

    let code = raw.code.trim().to_uppercase();
    if code.is_empty() {
        errors.insert("code", "Code is required");
    } else if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-') {
        errors.insert("code", "Code can only contain letters, numbers, and hyphens");
    } else if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&code.len()) {
        errors.insert("code", "Code must be between 3 and 50 characters");
    }

    let discount_type = raw.discount_type.parse::<DiscountType>().ok();
    if discount_type.is_none() {
        errors.insert("discountType", "Discount type must be percentage or fixed amount");
    }

    let discount_value = parse_number(&raw.discount_value);
    match discount_value {
        Some(v) if v > 0.0 => {
            if discount_type == Some(DiscountType::Percentage) && v > 100.0 {
                errors.insert("discountValue", "Percentage discount cannot exceed 100");
            }
        }
        _ => errors.insert("discountValue", "Discount value must be a positive number"),
    }

    let minimum_purchase = if raw.minimum_purchase.trim().is_empty() {
        None
    } else {
        let parsed = parse_number(&raw.minimum_purchase).filter(|v| *v >= 0.0);
        if parsed.is_none() {
            errors.insert("minimumPurchase", "Minimum purchase must be a non-negative number");
        }
        parsed
    };

    let usage_limit = if raw.usage_limit.trim().is_empty() {
        None
    } else {
        let parsed = parse_positive_integer(&raw.usage_limit);
        if parsed.is_none() {
            errors.insert("usageLimit", "Usage limit must be a positive whole number");
        }
        parsed
    };

    let starts_at = parse_date(&raw.starts_at);
    if starts_at.is_none() {
        errors.insert("startsAt", "Start date is required");
    }

    let ends_at = if raw.ends_at.trim().is_empty() {
        None
    } else {
        let parsed = parse_date(&raw.ends_at);
        match (parsed, starts_at) {
            (None, _) => errors.insert("endsAt", "End date must be a valid date"),
            (Some(end), Some(start)) if end <= start => {
                errors.insert("endsAt", "End date must be after start date")
            }
            _ => {}
        }
        parsed
    };

    match (discount_type, discount_value, starts_at) {
        (Some(discount_type), Some(discount_value), Some(starts_at)) if errors.is_empty() => {
            Ok(ValidatedCoupon {
                title: title.to_string(),
                code,
                discount_type,
                discount_value,
                minimum_purchase,
                usage_limit,
                starts_at,
                ends_at,
            })
        }
        _ => Err(errors),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_positive_integer(raw: &str) -> Option<i32> {
    let value = parse_number(raw)?;
    if value <= 0.0 || value.fract() != 0.0 || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value as i32)
}

/// Accepts RFC 3339 timestamps, `datetime-local` values and plain dates.
/// Values without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

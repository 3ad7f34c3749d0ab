//! HTTP route modules for the coupon admin application.
//!
//! - `coupons`: coupon list, bulk actions, create, edit, toggle and delete

pub mod coupons;

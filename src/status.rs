//! Derived coupon status.
//!
//! Status is never stored. `classify` computes it for display, and
//! `status_condition` expresses the same rule as a filter for list queries.
//! A deactivated coupon is `inactive` regardless of its date window, and a
//! coupon that has not started yet is `scheduled` even if `ends_at` has passed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{CmpOp, Column, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Scheduled,
    Expired,
    Inactive,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Active,
        Status::Scheduled,
        Status::Expired,
        Status::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Scheduled => "scheduled",
            Status::Expired => "expired",
            Status::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

/// Classify a coupon at `now`. First match wins.
pub fn classify(
    is_active: bool,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Status {
    if !is_active {
        return Status::Inactive;
    }
    if now < starts_at {
        return Status::Scheduled;
    }
    if ends_at.is_some_and(|end| now > end) {
        return Status::Expired;
    }
    Status::Active
}

/// The row predicate selecting coupons whose `classify` result is `status`.
pub fn status_condition(status: Status, now: DateTime<Utc>) -> Filter {
    match status {
        Status::Active => Filter::And(vec![
            Filter::eq(Column::IsActive, true),
            Filter::compare(Column::StartsAt, CmpOp::Lte, now),
            Filter::Or(vec![
                Filter::IsNull(Column::EndsAt),
                Filter::compare(Column::EndsAt, CmpOp::Gte, now),
            ]),
        ]),
        Status::Scheduled => Filter::And(vec![
            Filter::eq(Column::IsActive, true),
            Filter::compare(Column::StartsAt, CmpOp::Gt, now),
        ]),
        Status::Expired => Filter::And(vec![
            Filter::eq(Column::IsActive, true),
            Filter::IsNotNull(Column::EndsAt),
            Filter::compare(Column::EndsAt, CmpOp::Lt, now),
        ]),
        Status::Inactive => Filter::eq(Column::IsActive, false),
    }
}

/// OR of the selected statuses' conditions, or `None` when nothing is selected.
pub fn status_filter(statuses: &[Status], now: DateTime<Utc>) -> Option<Filter> {
    if statuses.is_empty() {
        return None;
    }
    Some(Filter::or(
        statuses.iter().map(|s| status_condition(*s, now)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coupon, DiscountType};
    use chrono::{Duration, TimeZone};

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn coupon(is_active: bool, starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> Coupon {
        Coupon {
            id: 1,
            shop: "shop.test".into(),
            title: "Test".into(),
            code: "TEST".into(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            minimum_purchase: None,
            usage_limit: None,
            usage_count: 0,
            starts_at,
            ends_at,
            is_active,
            shopify_discount_id: None,
            created_at: starts_at,
            updated_at: starts_at,
        }
    }

    #[test]
    fn test_inactive_overrides_dates() {
        let now = ymd(2025, 6, 1);
        assert_eq!(classify(false, ymd(2020, 1, 1), None, now), Status::Inactive);
        assert_eq!(
            classify(false, ymd(2030, 1, 1), Some(ymd(2020, 1, 1)), now),
            Status::Inactive
        );
    }

    #[test]
    fn test_future_start_is_scheduled() {
        let now = ymd(2025, 6, 1);
        assert_eq!(
            classify(true, now + Duration::days(365), None, now),
            Status::Scheduled
        );
    }

    #[test]
    fn test_scheduled_wins_over_expired() {
        let now = ymd(2025, 6, 1);
        assert_eq!(
            classify(true, ymd(2026, 1, 1), Some(ymd(2025, 1, 1)), now),
            Status::Scheduled
        );
    }

    #[test]
    fn test_past_end_is_expired() {
        assert_eq!(
            classify(true, ymd(2020, 1, 1), Some(ymd(2020, 12, 31)), ymd(2025, 1, 1)),
            Status::Expired
        );
    }

    #[test]
    fn test_open_ended_started_coupon_is_active() {
        let now = ymd(2025, 6, 1);
        assert_eq!(classify(true, ymd(2020, 1, 1), None, now), Status::Active);
        // Boundaries are inclusive on both ends.
        assert_eq!(classify(true, now, Some(now), now), Status::Active);
    }

    #[test]
    fn test_exactly_one_condition_matches_the_classified_status() {
        let now = ymd(2025, 6, 1);
        let dates = [
            ymd(2020, 1, 1),
            now - Duration::days(1),
            now,
            now + Duration::days(1),
            ymd(2030, 1, 1),
        ];
        for is_active in [true, false] {
            for starts_at in dates {
                let ends = std::iter::once(None).chain(dates.iter().copied().map(Some));
                // Validation guarantees ends_at > starts_at for stored rows.
                for ends_at in ends.filter(|end| end.map_or(true, |e| e > starts_at)) {
                    let row = coupon(is_active, starts_at, ends_at);
                    let expected = classify(is_active, starts_at, ends_at, now);
                    for status in Status::ALL {
                        assert_eq!(
                            status_condition(status, now).matches(&row),
                            status == expected,
                            "status {status} for active={is_active} start={starts_at} end={ends_at:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_status_filter_ors_in_selection_order() {
        let now = ymd(2025, 6, 1);
        assert_eq!(status_filter(&[], now), None);
        assert_eq!(
            status_filter(&[Status::Inactive], now),
            Some(Filter::eq(Column::IsActive, false))
        );
        assert_eq!(
            status_filter(&[Status::Active, Status::Inactive], now),
            Some(Filter::Or(vec![
                status_condition(Status::Active, now),
                status_condition(Status::Inactive, now),
            ]))
        );
    }
}

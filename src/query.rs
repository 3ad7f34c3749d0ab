//! Coupon list query building.
//!
//! `parse_coupon_list_params` turns untrusted, multi-valued query parameters
//! into a canonical `CouponListParams`; invalid values fall back to defaults.
//! `build_coupon_list_query` compiles those params into a shop-scoped filter
//! with ordering and pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{Column, Filter, Value};
use crate::models::DiscountType;
use crate::status::{status_filter, Status};

pub const PAGE_SIZE: u32 = 10;

/// Ordered, multi-valued string pairs from a query string or form body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawParams(Vec<(String, String)>);

impl RawParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in submission order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Code,
    #[default]
    CreatedAt,
    DiscountValue,
}

impl SortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "code" => Some(SortField::Code),
            "createdAt" => Some(SortField::CreatedAt),
            "discountValue" => Some(SortField::DiscountValue),
            _ => None,
        }
    }

    pub fn sql_name(self) -> &'static str {
        match self {
            SortField::Code => "code",
            SortField::CreatedAt => "created_at",
            SortField::DiscountValue => "discount_value",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Single-key ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Canonical list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponListParams {
    pub search: String,
    pub status: Vec<Status>,
    pub discount_type: Vec<DiscountType>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl Default for CouponListParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: Vec::new(),
            discount_type: Vec::new(),
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

pub fn parse_coupon_list_params(params: &RawParams) -> CouponListParams {
    let search = params.get("search").unwrap_or_default().to_string();

    let status = params
        .get_all("status")
        .filter_map(|s| s.parse::<Status>().ok())
        .collect();

    let discount_type = params
        .get_all("discountType")
        .filter_map(|d| d.parse::<DiscountType>().ok())
        .collect();

    let sort = params
        .get("sort")
        .and_then(SortField::parse)
        .unwrap_or_default();

    let direction = params
        .get("direction")
        .and_then(SortDirection::parse)
        .unwrap_or_default();

    let page = params
        .get("page")
        .and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(1);

    CouponListParams {
        search,
        status,
        discount_type,
        sort,
        direction,
        page,
        page_size: PAGE_SIZE,
    }
}

/// A compiled list query. `filter` alone is also the count query.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponListQuery {
    pub filter: Filter,
    pub order_by: OrderBy,
    pub offset: i64,
    pub limit: i64,
}

pub fn build_coupon_list_query(
    shop: &str,
    params: &CouponListParams,
    now: DateTime<Utc>,
) -> CouponListQuery {
    let mut conditions = vec![Filter::shop(shop)];

    if !params.search.is_empty() {
        conditions.push(Filter::Or(vec![
            Filter::Contains(Column::Code, params.search.clone()),
            Filter::Contains(Column::Title, params.search.clone()),
        ]));
    }

    if let Some(status) = status_filter(&params.status, now) {
        conditions.push(status);
    }

    if !params.discount_type.is_empty() {
        conditions.push(Filter::In(
            Column::DiscountType,
            params
                .discount_type
                .iter()
                .map(|d| Value::from(d.as_str()))
                .collect(),
        ));
    }

    CouponListQuery {
        filter: Filter::and(conditions),
        order_by: OrderBy {
            field: params.sort,
            direction: params.direction,
        },
        offset: i64::from(params.page - 1) * i64::from(params.page_size),
        limit: i64::from(params.page_size),
    }
}

//! Authenticated admin session.
//!
//! OAuth and session-token exchange happen in the front proxy; it forwards the
//! resolved shop domain and its offline Admin API token as request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub const SHOP_HEADER: &str = "x-shopify-shop-domain";
pub const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

/// The tenant a request acts for, plus the credential for its Admin API.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub shop: String,
    pub access_token: String,
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("shop", &self.shop)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl AdminSession {
    pub fn new(shop: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            access_token: access_token.into(),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let shop = header(parts, SHOP_HEADER).ok_or(AppError::Unauthorized)?;
        let access_token = header(parts, ACCESS_TOKEN_HEADER).ok_or(AppError::Unauthorized)?;
        Ok(AdminSession::new(shop, access_token))
    }
}

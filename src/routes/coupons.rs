//! Coupon admin routes.
//!
//! GET  /app              - List coupons (search, filter, sort, paginate)
//! POST /app              - Bulk actions (`_action=bulkDelete`, repeated `ids`)
//! POST /app/coupons/new  - Create a coupon
//! GET  /app/coupons/{id} - Retrieve a coupon
//! POST /app/coupons/{id} - `_action` = update | toggle | delete
//!
//! Every read and write is scoped to the session's shop. Platform discount
//! sync runs after the local write and never changes its result.

use axum::extract::{Form, Path, Query};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::error::AppError;
use crate::filter::{Column, Filter, Value};
use crate::format::format_discount;
use crate::models::{
    BulkDeleteResponse, Coupon, CouponFormData, CouponListItem, CouponListResponse,
    CouponResponse, ToggleResponse,
};
use crate::query::{build_coupon_list_query, parse_coupon_list_params, OrderBy, RawParams};
use crate::session::AdminSession;
use crate::shopify::SharedGateway;
use crate::status::classify;
use crate::store::{owned_by, SharedStore};
use crate::sync::{self, SyncOutcome};
use crate::validation::validate_coupon_form;

/// Form field carrying the action discriminator.
const ACTION_FIELD: &str = "_action";

/// Build the coupons router.
pub fn router() -> Router {
    Router::new()
        .route("/app", get(list_coupons).post(bulk_action))
        .route("/app/coupons/new", post(create_coupon))
        .route("/app/coupons/{id}", get(get_coupon).post(coupon_action))
}

fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim().parse().map_err(|_| AppError::NotFound)
}

/// Redirect to the list with a toast flag, plus `syncFailed=1` when the
/// platform discount could not be brought in line.
fn redirect_to_list(flag: &str, outcome: SyncOutcome) -> Redirect {
    let mut location = format!("/app?{}=1", flag);
    if outcome.failed() {
        location.push_str("&syncFailed=1");
    }
    Redirect::to(&location)
}

async fn find_owned(store: &SharedStore, shop: &str, id: i32) -> Result<Coupon, AppError> {
    store
        .find_first(&owned_by(shop, id))
        .await?
        .ok_or(AppError::NotFound)
}

/// List one page of the shop's coupons with their derived status.
async fn list_coupons(
    session: AdminSession,
    Extension(store): Extension<SharedStore>,
    Query(raw): Query<RawParams>,
) -> Result<Json<CouponListResponse>, AppError> {
    let now = Utc::now();
    let params = parse_coupon_list_params(&raw);
    let query = build_coupon_list_query(&session.shop, &params, now);

    let rows = store
        .find_many(&query.filter, query.order_by, query.offset, query.limit)
        .await?;
    let total_count = store.count(&query.filter).await?;

    let coupons = rows
        .into_iter()
        .map(|coupon| CouponListItem {
            status: classify(coupon.is_active, coupon.starts_at, coupon.ends_at, now),
            discount_label: format_discount(coupon.discount_type, coupon.discount_value),
            coupon,
        })
        .collect();

    Ok(Json(CouponListResponse {
        coupons,
        total_count,
        page: params.page,
        page_size: params.page_size,
        search: params.search,
        status: params.status,
        discount_type: params.discount_type,
        sort: params.sort,
        direction: params.direction,
    }))
}

/// Handle list-level actions. Only `bulkDelete` is recognized.
async fn bulk_action(
    session: AdminSession,
    Extension(store): Extension<SharedStore>,
    Extension(gateway): Extension<SharedGateway>,
    Form(form): Form<RawParams>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if form.get(ACTION_FIELD) != Some("bulkDelete") {
        return Err(AppError::UnknownAction);
    }

    let ids: Vec<i32> = form
        .get_all("ids")
        .filter_map(|id| id.trim().parse().ok())
        .collect();
    if ids.is_empty() {
        return Ok(Json(BulkDeleteResponse { deleted: 0 }));
    }

    let filter = Filter::and(vec![
        Filter::shop(&session.shop),
        Filter::In(Column::Id, ids.iter().copied().map(Value::Int).collect()),
    ]);

    // Remote deletes go first, one at a time; failures do not block the local delete.
    let limit = i64::try_from(ids.len()).unwrap_or(i64::MAX);
    let targets = store.find_many(&filter, OrderBy::default(), 0, limit).await?;
    for coupon in &targets {
        sync::sync_deleted(gateway.as_ref(), &session, coupon).await;
    }

    let deleted = store.delete_many(&filter).await?;
    info!("Bulk deleted {} coupons for {}", deleted, session.shop);

    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Validate and create a coupon, then mirror it to a platform discount.
async fn create_coupon(
    session: AdminSession,
    Extension(store): Extension<SharedStore>,
    Extension(gateway): Extension<SharedGateway>,
    Form(form): Form<RawParams>,
) -> Result<Redirect, AppError> {
    let validated = validate_coupon_form(&CouponFormData::from_params(&form))?;
    let coupon = store.create(&session.shop, &validated).await?;
    info!("Coupon {} ({}) created for {}", coupon.id, coupon.code, session.shop);

    let outcome = sync::sync_created(gateway.as_ref(), store.as_ref(), &session, &coupon).await;
    Ok(redirect_to_list("created", outcome))
}

/// Retrieve a coupon owned by the session's shop.
async fn get_coupon(
    session: AdminSession,
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<CouponResponse>, AppError> {
    let id = parse_id(&id)?;
    let coupon = find_owned(&store, &session.shop, id).await?;
    Ok(Json(CouponResponse { coupon }))
}

/// Dispatch a per-coupon action. A missing or blank `_action` means update.
async fn coupon_action(
    session: AdminSession,
    Extension(store): Extension<SharedStore>,
    Extension(gateway): Extension<SharedGateway>,
    Path(id): Path<String>,
    Form(form): Form<RawParams>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let existing = find_owned(&store, &session.shop, id).await?;

    let action = form.get(ACTION_FIELD).map(str::trim).filter(|a| !a.is_empty());
    match action {
        Some("delete") => {
            let outcome = sync::sync_deleted(gateway.as_ref(), &session, &existing).await;
            store.delete(&session.shop, id).await?;
            info!("Coupon {} deleted for {}", id, session.shop);
            Ok(redirect_to_list("deleted", outcome).into_response())
        }
        Some("toggle") => {
            let is_active = !existing.is_active;
            store.set_active(&session.shop, id, is_active).await?;
            info!(
                "Coupon {} {} for {}",
                id,
                if is_active { "activated" } else { "deactivated" },
                session.shop
            );
            sync::sync_toggled(gateway.as_ref(), &session, &existing, is_active).await;
            Ok(Json(ToggleResponse {
                success: true,
                is_active,
            })
            .into_response())
        }
        None | Some("update") => {
            let validated = validate_coupon_form(&CouponFormData::from_params(&form))?;
            let updated = store.update(&session.shop, id, &validated).await?;
            info!("Coupon {} updated for {}", id, session.shop);
            let outcome = sync::sync_updated(gateway.as_ref(), &session, &updated).await;
            Ok(redirect_to_list("updated", outcome).into_response())
        }
        Some(_) => Err(AppError::UnknownAction),
    }
}

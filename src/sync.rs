//! Best-effort mirroring of local coupons to platform discounts.
//!
//! The local record is authoritative. Nothing here returns an error: failures
//! are logged and reported as `SyncOutcome::Failed` so callers can attach a
//! notice, and the local mutation always stands.

use tracing::{error, info, warn};

use crate::models::{Coupon, ValidatedCoupon};
use crate::session::AdminSession;
use crate::shopify::{DiscountGateway, GatewayError, MutationResult};
use crate::store::CouponStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The coupon has never been synced, so there is nothing to change remotely.
    Skipped,
    Failed,
}

impl SyncOutcome {
    pub fn failed(self) -> bool {
        self == SyncOutcome::Failed
    }
}

fn settle(action: &str, code: &str, result: Result<MutationResult, GatewayError>) -> SyncOutcome {
    match result {
        Ok(res) if res.user_errors.is_empty() => SyncOutcome::Synced,
        Ok(res) => {
            warn!(
                "Discount {} for {} reported user errors: {}",
                action,
                code,
                res.user_error_summary()
            );
            SyncOutcome::Failed
        }
        Err(e) => {
            error!("Discount {} for {} failed: {}", action, code, e);
            SyncOutcome::Failed
        }
    }
}

async fn create_remote(
    gateway: &dyn DiscountGateway,
    session: &AdminSession,
    coupon: &ValidatedCoupon,
) -> Result<MutationResult, GatewayError> {
    let function_id = gateway.function_id(session).await?;
    gateway.create(session, &function_id, coupon).await
}

/// Create the platform discount for a new coupon and record its id locally.
pub async fn sync_created(
    gateway: &dyn DiscountGateway,
    store: &dyn CouponStore,
    session: &AdminSession,
    coupon: &Coupon,
) -> SyncOutcome {
    let result = create_remote(gateway, session, &ValidatedCoupon::from(coupon)).await;
    let discount_id = match &result {
        Ok(res) => res.id.clone().filter(|id| !id.is_empty()),
        Err(_) => None,
    };
    let outcome = settle("create", &coupon.code, result);

    let Some(discount_id) = discount_id else {
        return SyncOutcome::Failed;
    };
    if let Err(e) = store
        .set_shopify_discount_id(&session.shop, coupon.id, &discount_id)
        .await
    {
        error!(
            "Failed to record discount {} on coupon {}: {}",
            discount_id, coupon.id, e
        );
        return SyncOutcome::Failed;
    }
    if outcome == SyncOutcome::Synced {
        info!("Coupon {} synced as {}", coupon.id, discount_id);
    }
    outcome
}

/// Push edited fields to the platform discount, if one exists.
pub async fn sync_updated(
    gateway: &dyn DiscountGateway,
    session: &AdminSession,
    coupon: &Coupon,
) -> SyncOutcome {
    let Some(discount_id) = coupon.shopify_discount_id.as_deref() else {
        return SyncOutcome::Skipped;
    };
    let result = gateway
        .update(session, discount_id, &ValidatedCoupon::from(coupon))
        .await;
    settle("update", &coupon.code, result)
}

/// Remove the platform discount, if one exists.
pub async fn sync_deleted(
    gateway: &dyn DiscountGateway,
    session: &AdminSession,
    coupon: &Coupon,
) -> SyncOutcome {
    let Some(discount_id) = coupon.shopify_discount_id.as_deref() else {
        return SyncOutcome::Skipped;
    };
    let result = gateway.delete(session, discount_id).await;
    settle("delete", &coupon.code, result)
}

/// Match the platform discount's activation to `is_active`.
pub async fn sync_toggled(
    gateway: &dyn DiscountGateway,
    session: &AdminSession,
    coupon: &Coupon,
    is_active: bool,
) -> SyncOutcome {
    let Some(discount_id) = coupon.shopify_discount_id.as_deref() else {
        return SyncOutcome::Skipped;
    };
    if is_active {
        let result = gateway.activate(session, discount_id).await;
        settle("activate", &coupon.code, result)
    } else {
        let result = gateway.deactivate(session, discount_id).await;
        settle("deactivate", &coupon.code, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;
    use crate::shopify::UserError;
    use crate::store::{owned_by, MemoryStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records calls; fails everything when `fail` is set.
    #[derive(Default)]
    struct StubGateway {
        calls: Mutex<Vec<String>>,
        fail: bool,
        user_errors: bool,
    }

    impl StubGateway {
        fn reply(&self, call: String, id: &str) -> Result<MutationResult, GatewayError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(GatewayError::FunctionNotFound);
            }
            let user_errors = if self.user_errors {
                vec![UserError { field: None, message: "Code must be unique".into() }]
            } else {
                Vec::new()
            };
            Ok(MutationResult { id: Some(id.to_string()), user_errors })
        }
    }

    #[async_trait]
    impl DiscountGateway for StubGateway {
        async fn function_id(&self, _: &AdminSession) -> Result<String, GatewayError> {
            self.reply("function_id".into(), "fn").map(|_| "gid://fn/1".to_string())
        }
        async fn create(
            &self,
            _: &AdminSession,
            function_id: &str,
            coupon: &ValidatedCoupon,
        ) -> Result<MutationResult, GatewayError> {
            self.reply(format!("create {function_id} {}", coupon.code), "gid://discount/1")
        }
        async fn update(
            &self,
            _: &AdminSession,
            id: &str,
            _: &ValidatedCoupon,
        ) -> Result<MutationResult, GatewayError> {
            self.reply(format!("update {id}"), id)
        }
        async fn delete(&self, _: &AdminSession, id: &str) -> Result<MutationResult, GatewayError> {
            self.reply(format!("delete {id}"), id)
        }
        async fn activate(&self, _: &AdminSession, id: &str) -> Result<MutationResult, GatewayError> {
            self.reply(format!("activate {id}"), id)
        }
        async fn deactivate(
            &self,
            _: &AdminSession,
            id: &str,
        ) -> Result<MutationResult, GatewayError> {
            self.reply(format!("deactivate {id}"), id)
        }
    }

    fn session() -> AdminSession {
        AdminSession::new("shop.test", "token")
    }

    async fn stored_coupon(store: &MemoryStore) -> Coupon {
        store
            .create(
                "shop.test",
                &ValidatedCoupon {
                    title: "Test".into(),
                    code: "TEST10".into(),
                    discount_type: DiscountType::Percentage,
                    discount_value: 10.0,
                    minimum_purchase: None,
                    usage_limit: None,
                    starts_at: Utc::now(),
                    ends_at: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_created_records_discount_id() {
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let coupon = stored_coupon(&store).await;

        let outcome = sync_created(&gateway, &store, &session(), &coupon).await;
        assert_eq!(outcome, SyncOutcome::Synced);
        assert_eq!(
            *gateway.calls.lock().unwrap(),
            vec!["function_id".to_string(), "create gid://fn/1 TEST10".to_string()]
        );
        let saved = store.find_first(&owned_by("shop.test", coupon.id)).await.unwrap().unwrap();
        assert_eq!(saved.shopify_discount_id.as_deref(), Some("gid://discount/1"));
    }

    #[tokio::test]
    async fn test_created_failure_leaves_coupon_unsynced() {
        let store = MemoryStore::new();
        let gateway = StubGateway { fail: true, ..Default::default() };
        let coupon = stored_coupon(&store).await;

        let outcome = sync_created(&gateway, &store, &session(), &coupon).await;
        assert!(outcome.failed());
        let saved = store.find_first(&owned_by("shop.test", coupon.id)).await.unwrap().unwrap();
        assert_eq!(saved.shopify_discount_id, None);
    }

    #[tokio::test]
    async fn test_user_errors_are_reported_as_failed() {
        let store = MemoryStore::new();
        let gateway = StubGateway { user_errors: true, ..Default::default() };
        let mut coupon = stored_coupon(&store).await;
        coupon.shopify_discount_id = Some("gid://discount/1".into());

        assert!(sync_updated(&gateway, &session(), &coupon).await.failed());
    }

    #[tokio::test]
    async fn test_created_with_user_errors_keeps_id_but_fails() {
        let store = MemoryStore::new();
        let gateway = StubGateway { user_errors: true, ..Default::default() };
        let coupon = stored_coupon(&store).await;

        let outcome = sync_created(&gateway, &store, &session(), &coupon).await;
        assert_eq!(outcome, SyncOutcome::Failed);
        let saved = store.find_first(&owned_by("shop.test", coupon.id)).await.unwrap().unwrap();
        assert_eq!(saved.shopify_discount_id.as_deref(), Some("gid://discount/1"));
    }

    #[tokio::test]
    async fn test_unsynced_coupon_skips_remote_calls() {
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let coupon = stored_coupon(&store).await;

        assert_eq!(sync_updated(&gateway, &session(), &coupon).await, SyncOutcome::Skipped);
        assert_eq!(sync_deleted(&gateway, &session(), &coupon).await, SyncOutcome::Skipped);
        assert_eq!(
            sync_toggled(&gateway, &session(), &coupon, false).await,
            SyncOutcome::Skipped
        );
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_picks_activate_or_deactivate() {
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let mut coupon = stored_coupon(&store).await;
        coupon.shopify_discount_id = Some("gid://discount/1".into());

        sync_toggled(&gateway, &session(), &coupon, false).await;
        sync_toggled(&gateway, &session(), &coupon, true).await;
        assert_eq!(
            *gateway.calls.lock().unwrap(),
            vec![
                "deactivate gid://discount/1".to_string(),
                "activate gid://discount/1".to_string()
            ]
        );
    }
}

//! # Seed
//!
//! Replaces a development shop's coupons with the fixtures in
//! `seeds/coupons.yaml` (or the YAML file given as the first argument).
//! Fixture dates are day offsets from now, so statuses stay stable over time.

use anyhow::{anyhow, Context};
use chrono::{Duration, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::info;

use coupon_admin::config::AppConfig;
use coupon_admin::db;
use coupon_admin::filter::Filter;
use coupon_admin::models::CouponFormData;
use coupon_admin::store::{CouponStore, PgCouponStore};
use coupon_admin::validation::validate_coupon_form;

const BUNDLED_FIXTURES: &str = include_str!("../../seeds/coupons.yaml");
const DEFAULT_SHOP: &str = "dev-shop.myshopify.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    title: String,
    code: String,
    discount_type: String,
    discount_value: f64,
    #[serde(default)]
    minimum_purchase: Option<f64>,
    #[serde(default)]
    usage_limit: Option<i32>,
    /// Negative values are in the past.
    starts_in_days: i64,
    #[serde(default)]
    ends_in_days: Option<i64>,
    #[serde(default = "active_by_default")]
    is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl Fixture {
    fn form_data(&self) -> CouponFormData {
        let now = Utc::now();
        let day = |offset: i64| {
            (now + Duration::days(offset)).to_rfc3339_opts(SecondsFormat::Secs, true)
        };
        CouponFormData {
            title: self.title.clone(),
            code: self.code.clone(),
            discount_type: self.discount_type.clone(),
            discount_value: self.discount_value.to_string(),
            minimum_purchase: self.minimum_purchase.map(|v| v.to_string()).unwrap_or_default(),
            usage_limit: self.usage_limit.map(|v| v.to_string()).unwrap_or_default(),
            starts_at: day(self.starts_in_days),
            ends_at: self.ends_in_days.map(day).unwrap_or_default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,coupon_admin=info".into()),
        )
        .init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading fixtures from {}", path))?,
        None => BUNDLED_FIXTURES.to_string(),
    };
    let fixtures: Vec<Fixture> = serde_yaml::from_str(&raw).context("parsing fixtures")?;

    let shop = std::env::var("SEED_SHOP").unwrap_or_else(|_| DEFAULT_SHOP.to_string());
    let config = AppConfig::from_env();
    let store = PgCouponStore::new(db::connect(&config).await?);

    let cleared = store.delete_many(&Filter::shop(&shop)).await?;
    info!("Cleared {} existing coupons for {}", cleared, shop);

    for fixture in &fixtures {
        let validated = validate_coupon_form(&fixture.form_data())
            .map_err(|errors| anyhow!("fixture {} is invalid: {:?}", fixture.code, errors))?;
        let coupon = store.create(&shop, &validated).await?;
        if !fixture.is_active {
            store.set_active(&shop, coupon.id, false).await?;
        }
        info!("Seeded {} ({})", coupon.code, coupon.title);
    }

    info!("Seeded {} coupons for {}", fixtures.len(), shop);
    Ok(())
}

//! Checkout discount rule.
//!
//! Runs once per checkout computation, outside the admin service, as a pure
//! function of the cart snapshot and the coupon configuration stored in the
//! discount's metafield. See `src/bin/coupon_discount.rs` for the stdin/stdout
//! entry point.

use serde::{Deserialize, Serialize};

use crate::models::DiscountType;

pub const DEFAULT_MESSAGE: &str = "Coupon discount";

// ============================================================================
// Function input
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    pub cart: Cart,
    #[serde(default)]
    pub discount_node: Option<DiscountNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub cost: CartCost,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    pub subtotal_amount: Money,
}

/// Decimal amount, transmitted as a string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Money {
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartLine {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscountNode {
    #[serde(default)]
    pub metafield: Option<Metafield>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metafield {
    pub value: String,
}

/// Coupon configuration stored as JSON in the discount's metafield.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfig {
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    #[serde(default)]
    pub discount_value: Option<f64>,
    #[serde(default)]
    pub minimum_purchase: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

// ============================================================================
// Function output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRunResult {
    pub discounts: Vec<Discount>,
    pub discount_application_strategy: DiscountApplicationStrategy,
}

impl FunctionRunResult {
    pub fn empty() -> Self {
        Self {
            discounts: Vec::new(),
            discount_application_strategy: DiscountApplicationStrategy::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountApplicationStrategy {
    First,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discount {
    pub targets: Vec<Target>,
    pub value: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    CartLine { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    Percentage { value: String },
    FixedAmount { amount: String },
}

// ============================================================================
// Evaluation
// ============================================================================

/// Entry point for a raw function input. Unreadable configuration yields no
/// discount.
pub fn run(input: &RunInput) -> FunctionRunResult {
    let config = input
        .discount_node
        .as_ref()
        .and_then(|node| node.metafield.as_ref())
        .and_then(|metafield| serde_json::from_str::<DiscountConfig>(&metafield.value).ok())
        .unwrap_or_default();
    evaluate(&input.cart, &config)
}

/// Apply the coupon to every cart line, or return no discount.
pub fn evaluate(cart: &Cart, config: &DiscountConfig) -> FunctionRunResult {
    let (Some(discount_type), Some(discount_value)) = (config.discount_type, config.discount_value)
    else {
        return FunctionRunResult::empty();
    };
    if discount_value <= 0.0 || !discount_value.is_finite() {
        return FunctionRunResult::empty();
    }

    // An unreadable subtotal counts as zero, so it never meets a minimum.
    if let Some(minimum) = config.minimum_purchase.filter(|m| *m > 0.0) {
        let subtotal = cart
            .cost
            .subtotal_amount
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        if subtotal < minimum {
            return FunctionRunResult::empty();
        }
    }

    let targets: Vec<Target> = cart
        .lines
        .iter()
        .map(|line| Target::CartLine { id: line.id.clone() })
        .collect();
    if targets.is_empty() {
        return FunctionRunResult::empty();
    }

    let value = match discount_type {
        DiscountType::Percentage => Value::Percentage {
            value: discount_value.to_string(),
        },
        DiscountType::FixedAmount => Value::FixedAmount {
            amount: discount_value.to_string(),
        },
    };

    let message = config
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_MESSAGE)
        .to_string();

    FunctionRunResult {
        discounts: vec![Discount {
            targets,
            value,
            message,
        }],
        discount_application_strategy: DiscountApplicationStrategy::First,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart(subtotal: &str, lines: &[&str]) -> Cart {
        Cart {
            cost: CartCost {
                subtotal_amount: Money { amount: subtotal.to_string() },
            },
            lines: lines.iter().map(|id| CartLine { id: id.to_string() }).collect(),
        }
    }

    fn config(discount_type: DiscountType, value: f64) -> DiscountConfig {
        DiscountConfig {
            discount_type: Some(discount_type),
            discount_value: Some(value),
            minimum_purchase: None,
            title: Some("Summer Sale".into()),
        }
    }

    #[test]
    fn test_percentage_targets_every_line() {
        let result = evaluate(
            &cart("100.0", &["gid://shopify/CartLine/1", "gid://shopify/CartLine/2"]),
            &config(DiscountType::Percentage, 10.0),
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "discounts": [{
                    "targets": [
                        { "cartLine": { "id": "gid://shopify/CartLine/1" } },
                        { "cartLine": { "id": "gid://shopify/CartLine/2" } }
                    ],
                    "value": { "percentage": { "value": "10" } },
                    "message": "Summer Sale"
                }],
                "discountApplicationStrategy": "FIRST"
            })
        );
    }

    #[test]
    fn test_fixed_amount_value() {
        let result = evaluate(&cart("20.0", &["l1"]), &config(DiscountType::FixedAmount, 8.99));
        assert_eq!(
            result.discounts[0].value,
            Value::FixedAmount { amount: "8.99".into() }
        );
    }

    #[test]
    fn test_missing_type_or_value_gives_nothing() {
        let mut cfg = config(DiscountType::Percentage, 10.0);
        cfg.discount_type = None;
        assert_eq!(evaluate(&cart("100", &["l1"]), &cfg), FunctionRunResult::empty());

        let mut cfg = config(DiscountType::Percentage, 10.0);
        cfg.discount_value = None;
        assert_eq!(evaluate(&cart("100", &["l1"]), &cfg), FunctionRunResult::empty());
    }

    #[test]
    fn test_minimum_purchase_threshold() {
        let mut cfg = config(DiscountType::Percentage, 10.0);
        cfg.minimum_purchase = Some(50.0);
        assert!(evaluate(&cart("49.99", &["l1"]), &cfg).discounts.is_empty());
        assert_eq!(evaluate(&cart("50.00", &["l1"]), &cfg).discounts.len(), 1);
    }

    #[test]
    fn test_unreadable_subtotal_fails_minimum() {
        let mut cfg = config(DiscountType::Percentage, 10.0);
        cfg.minimum_purchase = Some(50.0);
        assert!(evaluate(&cart("n/a", &["l1"]), &cfg).discounts.is_empty());
        assert!(evaluate(&cart("NaN", &["l1"]), &cfg).discounts.is_empty());

        cfg.minimum_purchase = None;
        assert_eq!(evaluate(&cart("n/a", &["l1"]), &cfg).discounts.len(), 1);
    }

    #[test]
    fn test_empty_cart_gives_nothing() {
        let result = evaluate(&cart("100", &[]), &config(DiscountType::Percentage, 10.0));
        assert_eq!(result, FunctionRunResult::empty());
    }

    #[test]
    fn test_blank_title_falls_back() {
        let mut cfg = config(DiscountType::Percentage, 10.0);
        cfg.title = None;
        assert_eq!(evaluate(&cart("1", &["l1"]), &cfg).discounts[0].message, DEFAULT_MESSAGE);
        cfg.title = Some(String::new());
        assert_eq!(evaluate(&cart("1", &["l1"]), &cfg).discounts[0].message, DEFAULT_MESSAGE);
    }

    #[test]
    fn test_run_reads_metafield_json() {
        let input: RunInput = serde_json::from_value(json!({
            "cart": {
                "cost": { "subtotalAmount": { "amount": "75.0" } },
                "lines": [{ "id": "gid://shopify/CartLine/1" }]
            },
            "discountNode": {
                "metafield": {
                    "value": "{\"discountType\":\"fixed_amount\",\"discountValue\":5,\"minimumPurchase\":25}"
                }
            }
        }))
        .unwrap();
        let result = run(&input);
        assert_eq!(result.discounts.len(), 1);
        assert_eq!(result.discounts[0].value, Value::FixedAmount { amount: "5".into() });
        assert_eq!(result.discounts[0].message, DEFAULT_MESSAGE);
    }

    #[test]
    fn test_run_without_metafield_gives_nothing() {
        let input: RunInput = serde_json::from_value(json!({
            "cart": { "cost": { "subtotalAmount": { "amount": "75.0" } }, "lines": [{ "id": "l1" }] },
            "discountNode": { "metafield": null }
        }))
        .unwrap();
        assert_eq!(run(&input), FunctionRunResult::empty());

        let garbage = RunInput {
            discount_node: Some(DiscountNode {
                metafield: Some(Metafield { value: "not json".into() }),
            }),
            ..input
        };
        assert_eq!(run(&garbage), FunctionRunResult::empty());
    }
}

//! Shopify Admin GraphQL client for app discounts.
//!
//! Each local coupon can be mirrored as a code app discount backed by the
//! `coupon-discount` function. The function reads its configuration from a
//! JSON metafield written here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::checkout::DiscountConfig;
use crate::models::ValidatedCoupon;
use crate::session::AdminSession;

pub const METAFIELD_NAMESPACE: &str = "$app:coupon-discount";
pub const METAFIELD_KEY: &str = "function-configuration";
pub const FUNCTION_API_TYPE: &str = "product_discounts";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("missing `{0}` in response")]
    MissingField(&'static str),

    #[error("Coupon discount function not found. Has the extension been deployed?")]
    FunctionNotFound,
}

/// A validation problem reported by a mutation. Not fatal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Outcome of a discount mutation: the affected discount id, if any, and the
/// user errors the API attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationResult {
    pub id: Option<String>,
    pub user_errors: Vec<UserError>,
}

impl MutationResult {
    pub fn user_error_summary(&self) -> String {
        self.user_errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Shared handle injected into route handlers.
pub type SharedGateway = Arc<dyn DiscountGateway>;

/// Maintains the platform discount that mirrors a coupon.
#[async_trait]
pub trait DiscountGateway: Send + Sync {
    /// Id of the deployed discount function.
    async fn function_id(&self, session: &AdminSession) -> Result<String, GatewayError>;

    async fn create(
        &self,
        session: &AdminSession,
        function_id: &str,
        coupon: &ValidatedCoupon,
    ) -> Result<MutationResult, GatewayError>;

    async fn update(
        &self,
        session: &AdminSession,
        discount_id: &str,
        coupon: &ValidatedCoupon,
    ) -> Result<MutationResult, GatewayError>;

    async fn delete(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError>;

    async fn activate(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError>;

    async fn deactivate(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError>;
}

// ============================================================================
// GraphQL documents
// ============================================================================

const FUNCTIONS_QUERY: &str = r#"
query {
  shopifyFunctions(first: 25) {
    nodes {
      id
      title
      apiType
    }
  }
}"#;

const CREATE_MUTATION: &str = r#"
mutation discountCodeAppCreate($codeAppDiscount: DiscountCodeAppInput!) {
  discountCodeAppCreate(codeAppDiscount: $codeAppDiscount) {
    codeAppDiscount {
      discountId
    }
    userErrors {
      field
      message
    }
  }
}"#;

const UPDATE_MUTATION: &str = r#"
mutation discountCodeAppUpdate($id: ID!, $codeAppDiscount: DiscountCodeAppInput!) {
  discountCodeAppUpdate(id: $id, codeAppDiscount: $codeAppDiscount) {
    codeAppDiscount {
      discountId
    }
    userErrors {
      field
      message
    }
  }
}"#;

const DELETE_MUTATION: &str = r#"
mutation discountCodeDelete($id: ID!) {
  discountCodeDelete(id: $id) {
    deletedCodeDiscountId
    userErrors {
      field
      message
    }
  }
}"#;

const ACTIVATE_MUTATION: &str = r#"
mutation discountCodeActivate($id: ID!) {
  discountCodeActivate(id: $id) {
    codeDiscountNode {
      id
    }
    userErrors {
      field
      message
    }
  }
}"#;

const DEACTIVATE_MUTATION: &str = r#"
mutation discountCodeDeactivate($id: ID!) {
  discountCodeDeactivate(id: $id) {
    codeDiscountNode {
      id
    }
    userErrors {
      field
      message
    }
  }
}"#;

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Deserialize)]
struct FunctionsData {
    #[serde(rename = "shopifyFunctions")]
    shopify_functions: FunctionConnection,
}

#[derive(Deserialize)]
struct FunctionConnection {
    nodes: Vec<FunctionNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionNode {
    id: String,
    api_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeAppPayload {
    code_app_discount: Option<CodeAppDiscount>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeAppDiscount {
    discount_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    deleted_code_discount_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePayload {
    code_discount_node: Option<NodeId>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Deserialize)]
struct NodeId {
    id: String,
}

// ============================================================================
// Client
// ============================================================================

/// Admin API client. One instance serves every shop; the shop and token come
/// from the request's session.
#[derive(Debug, Clone)]
pub struct ShopifyAdminClient {
    http: reqwest::Client,
    api_version: String,
    base_url: Option<String>,
}

impl ShopifyAdminClient {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_version: api_version.into(),
            base_url: None,
        }
    }

    /// Send every request to `base_url` instead of `https://{shop}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn endpoint(&self, shop: &str) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}", shop),
        };
        format!("{}/admin/api/{}/graphql.json", base, self.api_version)
    }

    /// Execute a GraphQL document and return the `data` object.
    async fn execute(
        &self,
        session: &AdminSession,
        query: &str,
        variables: Value,
    ) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(self.endpoint(&session.shop))
            .header("X-Shopify-Access-Token", &session.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let body: GraphQlResponse = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(GatewayError::GraphQl(messages.join("; ")));
        }
        body.data.ok_or(GatewayError::MissingField("data"))
    }

    /// Execute and decode the payload under `data.<field>`.
    async fn execute_field<T: DeserializeOwned>(
        &self,
        session: &AdminSession,
        field: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T, GatewayError> {
        let mut data = self.execute(session, query, variables).await?;
        let payload = data
            .get_mut(field)
            .map(Value::take)
            .filter(|v| !v.is_null())
            .ok_or(GatewayError::MissingField(field))?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn node_mutation(
        &self,
        session: &AdminSession,
        field: &'static str,
        query: &str,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError> {
        let payload: NodePayload = self
            .execute_field(session, field, query, json!({ "id": discount_id }))
            .await?;
        Ok(MutationResult {
            id: payload.code_discount_node.map(|n| n.id),
            user_errors: payload.user_errors,
        })
    }
}

fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The JSON string stored in the function configuration metafield.
pub fn metafield_value(coupon: &ValidatedCoupon) -> String {
    let config = DiscountConfig {
        discount_type: Some(coupon.discount_type),
        discount_value: Some(coupon.discount_value),
        minimum_purchase: coupon.minimum_purchase,
        title: Some(coupon.title.clone()),
    };
    serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string())
}

/// `DiscountCodeAppInput` for a coupon. `function_id` is only sent on create.
pub fn code_app_discount_input(coupon: &ValidatedCoupon, function_id: Option<&str>) -> Value {
    let mut input = json!({
        "title": coupon.title,
        "code": coupon.code,
        "startsAt": iso8601(coupon.starts_at),
        "endsAt": coupon.ends_at.map(iso8601),
        "usageLimit": coupon.usage_limit,
        "combinesWith": {
            "orderDiscounts": false,
            "productDiscounts": false,
            "shippingDiscounts": true
        },
        "metafields": [{
            "namespace": METAFIELD_NAMESPACE,
            "key": METAFIELD_KEY,
            "type": "json",
            "value": metafield_value(coupon)
        }]
    });
    if let Some(function_id) = function_id {
        input["functionId"] = json!(function_id);
    }
    input
}

#[async_trait]
impl DiscountGateway for ShopifyAdminClient {
    async fn function_id(&self, session: &AdminSession) -> Result<String, GatewayError> {
        let data = self.execute(session, FUNCTIONS_QUERY, json!({})).await?;
        let functions: FunctionsData = serde_json::from_value(data)?;
        functions
            .shopify_functions
            .nodes
            .into_iter()
            .find(|f| f.api_type == FUNCTION_API_TYPE)
            .map(|f| f.id)
            .ok_or(GatewayError::FunctionNotFound)
    }

    async fn create(
        &self,
        session: &AdminSession,
        function_id: &str,
        coupon: &ValidatedCoupon,
    ) -> Result<MutationResult, GatewayError> {
        debug!("Creating app discount for {} on {}", coupon.code, session.shop);
        let variables = json!({
            "codeAppDiscount": code_app_discount_input(coupon, Some(function_id))
        });
        let payload: CodeAppPayload = self
            .execute_field(session, "discountCodeAppCreate", CREATE_MUTATION, variables)
            .await?;
        Ok(MutationResult {
            id: payload.code_app_discount.map(|d| d.discount_id),
            user_errors: payload.user_errors,
        })
    }

    async fn update(
        &self,
        session: &AdminSession,
        discount_id: &str,
        coupon: &ValidatedCoupon,
    ) -> Result<MutationResult, GatewayError> {
        debug!("Updating app discount {} on {}", discount_id, session.shop);
        let variables = json!({
            "id": discount_id,
            "codeAppDiscount": code_app_discount_input(coupon, None)
        });
        let payload: CodeAppPayload = self
            .execute_field(session, "discountCodeAppUpdate", UPDATE_MUTATION, variables)
            .await?;
        Ok(MutationResult {
            id: payload.code_app_discount.map(|d| d.discount_id),
            user_errors: payload.user_errors,
        })
    }

    async fn delete(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError> {
        debug!("Deleting app discount {} on {}", discount_id, session.shop);
        let payload: DeletePayload = self
            .execute_field(
                session,
                "discountCodeDelete",
                DELETE_MUTATION,
                json!({ "id": discount_id }),
            )
            .await?;
        Ok(MutationResult {
            id: payload.deleted_code_discount_id,
            user_errors: payload.user_errors,
        })
    }

    async fn activate(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError> {
        self.node_mutation(session, "discountCodeActivate", ACTIVATE_MUTATION, discount_id)
            .await
    }

    async fn deactivate(
        &self,
        session: &AdminSession,
        discount_id: &str,
    ) -> Result<MutationResult, GatewayError> {
        self.node_mutation(session, "discountCodeDeactivate", DEACTIVATE_MUTATION, discount_id)
            .await
    }
}

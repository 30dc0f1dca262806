//! Backend API Client
//!
//! Creates the business objects a payment is collected for (orders and
//! subscription actions) and fetches the data the console needs to build
//! them. Every call carries the operator's bearer token.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConsoleConfig;
use crate::error::{PaymentError, Result, backend_message};

/// Price used when the menu does not carry one
pub const DEFAULT_ITEM_PRICE: f64 = 100.0;

/// Tax slab (percent) used when the menu does not carry one
pub const DEFAULT_TAX_SLAB: f64 = 5.0;

/// Logged-in user, from `/auth/me`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Menu entry for a branch
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub tax_slab: Option<f64>,
    /// Menu category the item was listed under
    #[serde(default)]
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    /// `[latitude, longitude]`
    pub coordinates: [f64; 2],
    pub pincode: u32,
}

impl Default for DeliveryAddress {
    fn default() -> Self {
        Self {
            address: "123 Test Street, Bengaluru".into(),
            coordinates: [12.9716, 77.5946],
            pincode: 560_001,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub phone_number: String,
    pub name: String,
}

impl From<&UserProfile> for Customer {
    fn from(user: &UserProfile) -> Self {
        Self {
            phone_number: user.phone_number.clone(),
            name: user.name.clone(),
        }
    }
}

/// Line item as the order endpoints expect it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub quantity: u32,
    pub price: f64,
    pub tax_slab: f64,
    #[serde(default)]
    pub variant: Option<Value>,
    #[serde(default)]
    pub add_ons: Vec<Value>,
}

impl OrderItem {
    pub fn from_food_item(item: &FoodItem, quantity: u32) -> Self {
        Self {
            id: item.id.clone(),
            quantity,
            price: item.price.unwrap_or(DEFAULT_ITEM_PRICE),
            tax_slab: item.tax_slab.unwrap_or(DEFAULT_TAX_SLAB),
            variant: None,
            add_ons: Vec::new(),
        }
    }
}

/// Order before totals are calculated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub branch: String,
    pub items: Vec<OrderItem>,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub customer: Option<Customer>,
}

fn default_order_type() -> String {
    "Delivery".into()
}

fn default_payment_method() -> String {
    "Online".into()
}

impl OrderDraft {
    pub fn new(branch: impl Into<String>, items: Vec<OrderItem>) -> Self {
        Self {
            branch: branch.into(),
            items,
            order_type: default_order_type(),
            payment_method: default_payment_method(),
            delivery_address: DeliveryAddress::default(),
            customer: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() {
            return Err(PaymentError::InvalidInput("Branch ID is required".into()));
        }
        if self.items.is_empty() {
            return Err(PaymentError::InvalidInput(
                "Please add at least one item to the order".into(),
            ));
        }
        if self.items.iter().any(|item| item.quantity == 0) {
            return Err(PaymentError::InvalidInput(
                "Item quantities must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Charges computed by `/order/calculate`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderTotals {
    pub sub_total: f64,
    pub grand_total: f64,
    pub packaging_charges: f64,
    pub packaging_charges_tax: f64,
    pub platform_fee: f64,
    pub platform_fee_tax: f64,
    pub delivery_charge: f64,
    pub delivery_tax: f64,
}

#[derive(Serialize)]
struct PricedOrder<'a> {
    #[serde(flatten)]
    draft: &'a OrderDraft,
    #[serde(flatten)]
    totals: &'a OrderTotals,
}

/// What the backend needs the widget to collect
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitData {
    pub razorpay_order_id: String,
    /// Minor units
    pub amount: u64,
}

/// Response of `/order/create`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order: Value,
    #[serde(default)]
    pub payment_init_data: Option<PaymentInitData>,
}

impl CreatedOrder {
    pub fn order_id(&self) -> &str {
        self.order
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Response of the subscription action endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCheckout {
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl SubscriptionCheckout {
    /// Payment-intent id, or [`PaymentError::MissingIntent`]
    pub fn intent_id(&self, action: &str) -> Result<String> {
        self.razorpay_order_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::MissingIntent(action.to_string()))
    }
}

#[derive(Deserialize)]
struct MeResponse {
    user: MeUser,
}

#[derive(Deserialize)]
struct MeUser {
    #[serde(rename = "_doc")]
    doc: UserProfile,
}

/// Client for the order/subscription backend
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    config: ConsoleConfig,
}

impl BackendClient {
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: ConsoleConfig) -> Self {
        Self {
            http,
            config: config.normalized(),
        }
    }

    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.config.auth_token)
            .send()
            .await?;
        decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.auth_token)
            .json(body)
            .send()
            .await?;
        decode(path, response).await
    }

    /// Profile of the user the auth token belongs to
    pub async fn current_user(&self) -> Result<UserProfile> {
        let me: MeResponse = self.get("/auth/me").await?;
        Ok(me.user.doc)
    }

    /// Menu for a branch, flattened across categories
    pub async fn food_items(&self, branch_id: &str) -> Result<Vec<FoodItem>> {
        if branch_id.trim().is_empty() {
            return Err(PaymentError::InvalidInput("Branch ID is required".into()));
        }

        let menu: serde_json::Map<String, Value> =
            self.get(&format!("/food-items/{branch_id}")).await?;

        let mut items = Vec::new();
        for (category, entries) in menu {
            let entries: Vec<FoodItem> = serde_json::from_value(entries)
                .map_err(|e| PaymentError::Decode(format!("category '{category}': {e}")))?;
            items.extend(entries.into_iter().map(|mut item| {
                item.category.clone_from(&category);
                item
            }));
        }

        tracing::debug!(branch_id = %branch_id, count = items.len(), "Fetched food items");
        Ok(items)
    }

    pub async fn calculate_order(&self, draft: &OrderDraft) -> Result<OrderTotals> {
        draft.validate()?;
        self.post("/order/calculate", draft).await
    }

    pub async fn create_order(
        &self,
        draft: &OrderDraft,
        totals: &OrderTotals,
    ) -> Result<CreatedOrder> {
        draft.validate()?;
        let created: CreatedOrder = self
            .post("/order/create", &PricedOrder { draft, totals })
            .await?;

        tracing::info!(order_id = %created.order_id(), "Order created");
        Ok(created)
    }

    pub async fn purchase_subscription(
        &self,
        branch_id: &str,
        subscription_id: &str,
        amount: u64,
    ) -> Result<SubscriptionCheckout> {
        self.post(
            "/subscription/purchase",
            &serde_json::json!({
                "branchId": branch_id,
                "subscriptionId": subscription_id,
                "amount": amount,
            }),
        )
        .await
    }

    pub async fn topup_subscription(
        &self,
        branch_id: &str,
        additional_orders: u64,
    ) -> Result<SubscriptionCheckout> {
        self.post(
            "/subscription-topup",
            &serde_json::json!({
                "branchId": branch_id,
                "additionalOrders": additional_orders,
            }),
        )
        .await
    }

    pub async fn upgrade_subscription(
        &self,
        branch_id: &str,
        new_subscription_id: &str,
        amount: u64,
    ) -> Result<SubscriptionCheckout> {
        self.post(
            "/subscription/upgrade",
            &serde_json::json!({
                "branchId": branch_id,
                "newSubscriptionId": new_subscription_id,
                "amount": amount,
            }),
        )
        .await
    }

    pub async fn renew_subscription(
        &self,
        branch_id: &str,
        amount: u64,
    ) -> Result<SubscriptionCheckout> {
        self.post(
            "/renew",
            &serde_json::json!({
                "branchId": branch_id,
                "amount": amount,
            }),
        )
        .await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = backend_message(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
        tracing::warn!(
            path = %path,
            status = status.as_u16(),
            message = %message,
            "Backend call failed"
        );
        return Err(PaymentError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| PaymentError::Decode(format!("{path}: {e}")))
}

//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use checkout_core::{
    AttemptStore, ConsoleConfig, FoodItem, MerchantProfile, OrderDraft, PaymentAction,
    PaymentAttempt, PaymentError, PaymentReceipt, UserProfile, VerificationError, WidgetOptions,
    WidgetResponse,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub config_valid: bool,
    pub open_checkouts: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Configuration as shown to the page; the token is masked
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub api_base_url: String,
    pub razorpay_key_id: String,
    pub auth_token: String,
    pub merchant: MerchantProfile,
}

/// New settings; an absent or empty token keeps the current one
#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub api_base_url: String,
    #[serde(default)]
    pub razorpay_key_id: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub branch_id: String,
    pub subscription_id: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupRequest {
    pub branch_id: String,
    pub additional_orders: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub branch_id: String,
    pub new_subscription_id: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    pub branch_id: String,
    pub amount: u64,
}

/// Everything the page needs to open the widget
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub attempt_id: Uuid,
    pub intent_id: String,
    pub options: WidgetOptions,
    pub details: Value,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub attempt_id: Option<Uuid>,
}

fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn payment_error(e: &PaymentError) -> ApiError {
    let (status, code) = match e {
        PaymentError::Verification(VerificationError::InvalidPurpose(_)) => {
            (StatusCode::BAD_REQUEST, "INVALID_PURPOSE")
        }
        _ if e.is_client_error() => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        PaymentError::UnknownIntent(_) => (StatusCode::NOT_FOUND, "UNKNOWN_INTENT"),
        PaymentError::MissingIntent(_) => (StatusCode::BAD_GATEWAY, "MISSING_INTENT"),
        PaymentError::Verification(VerificationError::BackendRejected { .. })
        | PaymentError::Backend { .. } => (StatusCode::BAD_GATEWAY, "BACKEND_REJECTED"),
        PaymentError::Verification(VerificationError::NetworkFailure(_))
        | PaymentError::Network(_) => (StatusCode::BAD_GATEWAY, "BACKEND_UNREACHABLE"),
        PaymentError::Verification(VerificationError::MalformedResponse(_))
        | PaymentError::Decode(_) => (StatusCode::BAD_GATEWAY, "BAD_BACKEND_RESPONSE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!(code, "{e}");
    } else {
        tracing::warn!(code, "{e}");
    }

    error_response(status, code, e.user_message())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config_valid = state.config.read().await.validate().is_ok();
    let open_checkouts = state.widgets.open_intents().map(|v| v.len()).unwrap_or(0);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        config_valid,
        open_checkouts,
    })
}

async fn config_view(state: &AppState) -> ConfigView {
    let config = state.config.read().await;
    ConfigView {
        api_base_url: config.api_base_url.clone(),
        razorpay_key_id: config.razorpay_key_id.clone(),
        auth_token: config.masked_token(),
        merchant: state.initiator.merchant().clone(),
    }
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    Json(config_view(&state).await)
}

/// Replace the operator settings
pub async fn update_config(
    State(state): State<AppState>,
    Json(payload): Json<ConfigUpdate>,
) -> Result<Json<ConfigView>, ApiError> {
    let mut current = state.config.write().await;

    let auth_token = payload
        .auth_token
        .filter(|token| !token.is_empty())
        .unwrap_or_else(|| current.auth_token.clone());
    let config = ConsoleConfig::new(payload.api_base_url, payload.razorpay_key_id, auth_token);
    config.validate().map_err(|e| payment_error(&e))?;

    tracing::info!(api_base_url = %config.api_base_url, "Console configuration updated");
    *current = config;
    drop(current);

    Ok(Json(config_view(&state).await))
}

/// Profile behind the configured auth token
pub async fn current_user(State(state): State<AppState>) -> Result<Json<UserProfile>, ApiError> {
    state
        .backend()
        .await
        .current_user()
        .await
        .map(Json)
        .map_err(|e| payment_error(&e))
}

pub async fn food_items(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
) -> Result<Json<Vec<FoodItem>>, ApiError> {
    state
        .backend()
        .await
        .food_items(&branch_id)
        .await
        .map(Json)
        .map_err(|e| payment_error(&e))
}

async fn start_payment(
    state: &AppState,
    action: PaymentAction,
) -> Result<Json<StartResponse>, ApiError> {
    let started = state
        .flow()
        .await
        .start(&action)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(StartResponse {
        attempt_id: started.attempt.id,
        intent_id: started.attempt.intent_id,
        options: started.options,
        details: started.details,
    }))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<StartResponse>, ApiError> {
    start_payment(&state, PaymentAction::Order { draft }).await
}

pub async fn purchase_subscription(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let action = PaymentAction::SubscriptionPurchase {
        branch_id: req.branch_id,
        subscription_id: req.subscription_id,
        amount: req.amount,
    };
    start_payment(&state, action).await
}

pub async fn topup_subscription(
    State(state): State<AppState>,
    Json(req): Json<TopupRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let action = PaymentAction::SubscriptionTopup {
        branch_id: req.branch_id,
        additional_orders: req.additional_orders,
    };
    start_payment(&state, action).await
}

pub async fn upgrade_subscription(
    State(state): State<AppState>,
    Json(req): Json<UpgradeRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let action = PaymentAction::SubscriptionUpgrade {
        branch_id: req.branch_id,
        new_subscription_id: req.new_subscription_id,
        amount: req.amount,
    };
    start_payment(&state, action).await
}

pub async fn renew_subscription(
    State(state): State<AppState>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let action = PaymentAction::SubscriptionRenewal {
        branch_id: req.branch_id,
        amount: req.amount,
    };
    start_payment(&state, action).await
}

/// Widget handler payload, posted by the page
pub async fn complete_checkout(
    State(state): State<AppState>,
    Json(payload): Json<WidgetResponse>,
) -> Result<(StatusCode, Json<CompleteResponse>), ApiError> {
    let intent_id = payload.razorpay_order_id.clone();
    state.widgets.complete(payload).map_err(|e| payment_error(&e))?;

    let attempt_id = state
        .attempts
        .get_by_intent(&intent_id)
        .map_err(|e| payment_error(&e))?
        .map(|a| a.id);

    Ok((StatusCode::ACCEPTED, Json(CompleteResponse { attempt_id })))
}

/// Payer closed the widget
pub async fn abandon_checkout(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.widgets.abandon(&intent_id).map_err(|e| payment_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_attempts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentAttempt>>, ApiError> {
    state
        .attempts
        .list()
        .map(Json)
        .map_err(|e| payment_error(&e))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentAttempt>, ApiError> {
    state
        .attempts
        .get(&id)
        .map_err(|e| payment_error(&e))?
        .map(Json)
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                "UNKNOWN_ATTEMPT",
                "Payment attempt not found",
            )
        })
}

/// Reset the session's payment details
pub async fn clear_attempts(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.attempts.clear().map_err(|e| payment_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Verify a receipt directly, bypassing the widget
pub async fn verify_receipt(
    State(state): State<AppState>,
    Path(purpose): Path<String>,
    Json(receipt): Json<PaymentReceipt>,
) -> Result<Json<Value>, ApiError> {
    let config = state.config.read().await.clone();

    state
        .dispatcher
        .verify_tagged(&purpose, &receipt, &config.api_base_url, &config.auth_token)
        .await
        .map(Json)
        .map_err(|e| payment_error(&PaymentError::from(e)))
}

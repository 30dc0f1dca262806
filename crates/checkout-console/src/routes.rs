//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    abandon_checkout, clear_attempts, complete_checkout, create_order, current_user, food_items,
    get_attempt, get_config, health_check, list_attempts, purchase_subscription,
    renew_subscription, topup_subscription, update_config, upgrade_subscription, verify_receipt,
};
use crate::state::AppState;

/// Build the console router; the page is served from `static_dir`
pub fn router(state: AppState, static_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & settings
        .route("/health", get(health_check))
        .route("/api/config", get(get_config).put(update_config))

        // Backend lookups
        .route("/api/me", get(current_user))
        .route("/api/food-items/{branch_id}", get(food_items))

        // Payment flows
        .route("/api/orders", post(create_order))
        .route("/api/subscriptions/purchase", post(purchase_subscription))
        .route("/api/subscriptions/topup", post(topup_subscription))
        .route("/api/subscriptions/upgrade", post(upgrade_subscription))
        .route("/api/subscriptions/renew", post(renew_subscription))

        // Widget callbacks
        .route("/api/checkout/complete", post(complete_checkout))
        .route("/api/checkout/{intent_id}/abandon", post(abandon_checkout))

        // Attempts
        .route("/api/attempts", get(list_attempts).delete(clear_attempts))
        .route("/api/attempts/{id}", get(get_attempt))
        .route("/api/verify/{purpose}", post(verify_receipt))

        // Console page
        .fallback_service(ServeDir::new(static_dir))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use checkout_core::ConsoleConfig;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(server: &MockServer) -> Router {
        app_with_key(server, "rzp_test_key")
    }

    fn app_with_key(server: &MockServer, key: &str) -> Router {
        let config = ConsoleConfig::new(server.uri(), key, "secret-token-1234");
        router(AppState::new(config), "static")
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        let (status, body) = send(&app(&server), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config_valid"], true);
        assert_eq!(body["open_checkouts"], 0);
    }

    #[tokio::test]
    async fn test_config_masks_token_and_rejects_bad_url() {
        let server = MockServer::start().await;
        let app = app(&server);

        let (_, body) = send(&app, "GET", "/api/config", None).await;
        assert_eq!(body["auth_token"], "*************1234");
        assert_eq!(body["merchant"]["currency"], "INR");

        let (status, body) = send(
            &app,
            "PUT",
            "/api/config",
            Some(json!({"api_base_url": "ftp://nope", "razorpay_key_id": "k", "auth_token": "t"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_verify_unknown_purpose_sends_nothing() {
        let server = MockServer::start().await;
        let receipt = json!({"intent_id": "order_1", "payment_id": "pay_1", "signature": "sig_1"});

        let (status, body) = send(&app(&server), "POST", "/api/verify/refund", Some(receipt)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_PURPOSE");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_passes_backend_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subscription/purchase-verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ok", "message": "verified"})),
            )
            .mount(&server)
            .await;

        let receipt = json!({"intent_id": "order_1", "payment_id": "pay_1", "signature": "sig_1"});
        let (status, body) = send(
            &app(&server),
            "POST",
            "/api/verify/subscription",
            Some(receipt),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "message": "verified"}));
    }

    async fn mount_renewal(server: &MockServer, order_id: &str) {
        Mock::given(method("POST"))
            .and(path("/renew"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"razorpayOrderId": order_id})),
            )
            .mount(server)
            .await;
    }

    async fn wait_for_state(app: &Router, attempt_id: &Value, expected: &str) -> Value {
        let uri = format!("/api/attempts/{}", attempt_id.as_str().unwrap());
        let mut state = Value::Null;
        for _ in 0..100 {
            let (_, attempt) = send(app, "GET", &uri, None).await;
            state = attempt["status"]["state"].clone();
            if state == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        state
    }

    #[tokio::test]
    async fn test_renewal_round_trip_through_page_callbacks() {
        let server = MockServer::start().await;
        mount_renewal(&server, "order_r1").await;
        Mock::given(method("POST"))
            .and(path("/subscription/renew-verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Renewed"})))
            .expect(1)
            .mount(&server)
            .await;

        let app = app(&server);
        let (status, started) = send(
            &app,
            "POST",
            "/api/subscriptions/renew",
            Some(json!({"branchId": "b1", "amount": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["options"]["order_id"], "order_r1");
        assert_eq!(started["options"]["amount"], 99_900);
        assert_eq!(started["options"]["key"], "rzp_test_key");

        let (status, completed) = send(
            &app,
            "POST",
            "/api/checkout/complete",
            Some(json!({
                "razorpay_order_id": "order_r1",
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": "sig_1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(completed["attempt_id"], started["attempt_id"]);

        let state = wait_for_state(&app, &started["attempt_id"], "verified").await;
        assert_eq!(state, "verified");

        let (status, _) = send(&app, "DELETE", "/api/attempts", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, attempts) = send(&app, "GET", "/api/attempts", None).await;
        assert_eq!(attempts, json!([]));
    }

    #[tokio::test]
    async fn test_missing_branch_is_bad_request() {
        let server = MockServer::start().await;
        let (status, body) = send(
            &app(&server),
            "POST",
            "/api/subscriptions/topup",
            Some(json!({"branchId": "", "additionalOrders": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Branch ID is required");
    }

    #[tokio::test]
    async fn test_abandon_unknown_intent() {
        let server = MockServer::start().await;
        let (status, body) =
            send(&app(&server), "POST", "/api/checkout/order_x/abandon", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_INTENT");
    }

    #[tokio::test]
    async fn test_abandon_after_start_releases_checkout() {
        let server = MockServer::start().await;
        mount_renewal(&server, "order_r2").await;

        let app = app(&server);
        let (status, started) = send(
            &app,
            "POST",
            "/api/subscriptions/renew",
            Some(json!({"branchId": "b1", "amount": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, health) = send(&app, "GET", "/health", None).await;
        assert_eq!(health["open_checkouts"], 1);

        let (status, _) = send(&app, "POST", "/api/checkout/order_r2/abandon", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let state = wait_for_state(&app, &started["attempt_id"], "abandoned").await;
        assert_eq!(state, "abandoned");

        let (_, health) = send(&app, "GET", "/health", None).await;
        assert_eq!(health["open_checkouts"], 0);

        // Only the renewal itself reached the backend
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_rejected_before_backend() {
        let server = MockServer::start().await;
        let (status, body) = send(
            &app_with_key(&server, ""),
            "POST",
            "/api/subscriptions/purchase",
            Some(json!({"branchId": "b1", "subscriptionId": "s1", "amount": 999})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Razorpay key id is not set");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_carries_delivery_address() {
        let server = MockServer::start().await;
        let address = json!({
            "address": "42 MG Road, Pune",
            "coordinates": [18.5204, 73.8567],
            "pincode": 411_001,
        });
        Mock::given(method("POST"))
            .and(path("/order/calculate"))
            .and(body_partial_json(json!({"deliveryAddress": address})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"grandTotal": 189.0})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/order/create"))
            .and(body_partial_json(json!({"deliveryAddress": address, "grandTotal": 189.0})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "order": {"_id": "o7"},
                "paymentInitData": {"razorpayOrderId": "order_o7", "amount": 18900},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, started) = send(
            &app(&server),
            "POST",
            "/api/orders",
            Some(json!({
                "branch": "b1",
                "items": [{"_id": "f1", "quantity": 1, "price": 180.0, "taxSlab": 5.0}],
                "deliveryAddress": address,
                "customer": {"phoneNumber": "9876543210", "name": "Asha"},
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["options"]["order_id"], "order_o7");
        assert_eq!(started["options"]["amount"], 18900);
    }
}

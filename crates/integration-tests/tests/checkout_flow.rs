//! End-to-end checkout flows against the storefront router.
//!
//! Run with: cargo test -p vinoteca-integration-tests

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use vinoteca_integration_tests::{FakeRateService, RateReply, TestClient};

fn madrid_address() -> Value {
    json!({
        "firstName": "Lucía",
        "lastName": "García",
        "street": "Calle Mayor 12",
        "city": "Madrid",
        "postalCode": "28013",
        "country": "es"
    })
}

fn quoted_methods() -> Value {
    json!([
        {
            "id": "standard",
            "name": "Standard",
            "description": "Delivered in 3-5 days",
            "price": 5.99,
            "estimatedDays": 4
        },
        {
            "id": "express",
            "name": "Express",
            "description": "Next business day",
            "price": 12.5,
            "estimatedDays": 1
        }
    ])
}

async fn client_with_cart(rates: &FakeRateService) -> TestClient {
    let mut client = TestClient::new(rates.url.clone());
    let response = client
        .post(
            "/api/cart/items",
            json!({
                "productId": "rioja-reserva",
                "name": "Rioja Reserva 2019",
                "unitPrice": 18.5,
                "quantity": 2
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["itemCount"], 2);
    assert_eq!(response.body["subtotal"], json!(37.0));
    client
}

#[tokio::test]
async fn test_health() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = TestClient::new(rates.url.clone());

    let response = client.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!("ok"));
}

#[tokio::test]
async fn test_full_checkout_flow() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    // Methods for the address, fetched once
    let response = client
        .post(
            "/api/checkout/shipping-methods",
            json!({ "address": madrid_address() }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["availableMethods"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["error"], Value::Null);
    assert_eq!(response.body["loading"], false);

    client
        .post(
            "/api/checkout/shipping-methods",
            json!({ "address": madrid_address() }),
        )
        .await;
    assert_eq!(rates.calls(), 1);

    // Shipping
    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": madrid_address(), "methodId": "express" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let shipping_info = &response.body["session"]["shippingInfo"];
    assert_eq!(shipping_info["method"]["id"], "express");
    assert_eq!(shipping_info["address"]["country"], "ES");
    assert_eq!(response.body["canProceedToPayment"], true);

    let response = client.post("/api/checkout/next", json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["session"]["currentStep"], "payment");

    // Payment and guest details
    let response = client
        .post(
            "/api/checkout/payment",
            json!({ "type": "credit_card", "holderName": "Lucía García" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = client
        .post(
            "/api/checkout/guest",
            json!({ "email": "lucia@example.com", "emailUpdates": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = client.post("/api/checkout/next", json!({})).await;
    assert_eq!(response.body["session"]["currentStep"], "review");
    assert_eq!(response.body["stepIndex"], 2);

    // Order
    let response = client.post("/api/checkout/order", json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    let order = &response.body["order"];
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["subtotal"], json!(37.0));
    assert_eq!(order["shippingCost"], json!(12.5));
    assert_eq!(order["total"], json!(49.5));
    assert_eq!(order["currency"], "EUR");
    assert_eq!(order["customerEmail"], "lucia@example.com");
    assert_eq!(
        response.body["checkout"]["session"]["currentStep"],
        "confirmation"
    );
    assert_eq!(response.body["checkout"]["cart"]["itemCount"], 0);

    // The cart is empty now, but the finished checkout stays reachable
    let response = client.get("/checkout/confirmation").await;
    assert_eq!(response.status, StatusCode::OK);
    let response = client.get("/checkout/shipping").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = client.post("/api/checkout/order", json!({})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_payment_without_shipping_redirects_to_shipping() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    let response = client.get("/checkout/payment").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/checkout/shipping"));

    let response = client.get("/api/checkout/steps/payment").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["redirect"], "/checkout/shipping");

    let response = client.get("/checkout/shipping").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_cart_redirects_to_cart() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = TestClient::new(rates.url.clone());

    let response = client.get("/checkout/shipping").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/cart"));

    let response = client.get("/checkout/unknown").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_service_failure_offers_fallback() {
    let rates = FakeRateService::start(RateReply::Failure(
        StatusCode::SERVICE_UNAVAILABLE,
        "Rates are down for maintenance".to_string(),
    ))
    .await;
    let mut client = client_with_cart(&rates).await;

    let response = client
        .post(
            "/api/checkout/shipping-methods",
            json!({ "address": madrid_address() }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["error"], "Rates are down for maintenance");
    let methods = response.body["availableMethods"].as_array().unwrap();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0]["id"], "standard");
    assert_eq!(methods[0]["price"], json!(5.99));

    // Retry goes back to the service
    client
        .post("/api/checkout/shipping-methods/retry", json!({}))
        .await;
    assert_eq!(rates.calls(), 2);

    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": madrid_address(), "methodId": "standard" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_incomplete_address_is_not_quoted() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    let response = client
        .post(
            "/api/checkout/shipping-methods",
            json!({ "address": { "country": "ES", "postalCode": "28013" } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["availableMethods"], json!([]));
    assert_eq!(rates.calls(), 0);
}

#[tokio::test]
async fn test_invalid_shipping_is_rejected() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    let mut address = madrid_address();
    address["postalCode"] = json!("2801");
    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": address, "methodId": "standard" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["errors"][0]["field"], "postalCode");

    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": madrid_address(), "methodId": "teleport" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = client.post("/api/checkout/next", json!({})).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_method_must_be_quoted_for_the_saved_address() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    client
        .post(
            "/api/checkout/shipping-methods",
            json!({ "address": madrid_address() }),
        )
        .await;

    let mut paris = madrid_address();
    paris["city"] = json!("Paris");
    paris["postalCode"] = json!("75001");
    paris["country"] = json!("FR");
    for method_id in ["express", "standard"] {
        let response = client
            .post(
                "/api/checkout/shipping",
                json!({ "address": paris, "methodId": method_id }),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.body["errors"][0]["field"], "method.id");
    }

    let response = client.get("/api/checkout").await;
    assert_eq!(response.body["session"]["shippingInfo"], Value::Null);

    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": madrid_address(), "methodId": "express" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(rates.calls(), 1);
}

#[tokio::test]
async fn test_standard_method_requires_a_quote() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    let response = client
        .post(
            "/api/checkout/shipping",
            json!({ "address": madrid_address(), "methodId": "standard" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["errors"][0]["field"], "method.id");
    assert_eq!(rates.calls(), 0);
}

#[tokio::test]
async fn test_cart_total_overflow_is_rejected() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = TestClient::new(rates.url.clone());

    let response = client
        .post(
            "/api/cart/items",
            json!({
                "productId": "cellar",
                "name": "The whole cellar",
                "unitPrice": 7e28,
                "quantity": 2
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = client.get("/api/cart").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["itemCount"], 0);
}

#[tokio::test]
async fn test_reset_starts_over() {
    let rates = FakeRateService::start(RateReply::Methods(quoted_methods())).await;
    let mut client = client_with_cart(&rates).await;

    let before = client.get("/api/checkout").await;
    let session_id = before.body["session"]["sessionId"].clone();
    client
        .post("/api/checkout/payment", json!({ "type": "cash" }))
        .await;

    let response = client.post("/api/checkout/reset", json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_ne!(response.body["session"]["sessionId"], session_id);
    assert_eq!(response.body["session"]["paymentMethod"], Value::Null);
    assert_eq!(response.body["cart"]["itemCount"], 2);
}

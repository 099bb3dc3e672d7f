#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{spawn_fake_server, TestApp};
use digistore::gateways::manual::DEFAULT_INSTRUCTIONS;
use digistore::models::{AutoQrisConfig, DuitkuConfig, GatewayKind, OrderStatus, Product, StoreSettings};
use digistore::store::Store;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

fn settings_for(gateway: GatewayKind) -> StoreSettings {
  let mut settings = StoreSettings::default();
  settings.payment.active_gateway = gateway;
  settings
}

fn checkout_body(product: &Product) -> Value {
  json!({
    "productId": product.id,
    "customer": { "name": "  Budi Santoso ", "email": "budi@example.com", "phone": "" },
  })
}

/// Posts to `/api/checkout` and returns the status with the JSON body.
macro_rules! post_checkout {
  ($service:expr, $body:expr) => {{
    let req = test::TestRequest::post().uri("/api/checkout").set_json($body).to_request();
    let resp = test::call_service(&$service, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
  }};
}

#[actix_web::test]
#[serial]
async fn manual_qris_without_config_uses_default_instructions() {
  let app = TestApp::with_settings(Some(settings_for(GatewayKind::ManualQris))).await;
  let product = app.add_product("Notion Kit", 99_000, Some(79_000)).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["paymentGateway"], "manual-qris");
  assert_eq!(
    body["paymentAction"],
    json!({ "type": "manual", "instructions": DEFAULT_INSTRUCTIONS, "qrImageUrl": null })
  );

  let order_number = body["orderNumber"].as_str().unwrap();
  assert!(order_number.starts_with("INV-"));
  let order = app.store.find_order_by_number(order_number).await.unwrap().unwrap();
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total, 79_000);
  assert_eq!(order.customer.name, "Budi Santoso");
  assert!(order.customer.phone.is_none());
  assert!(order.payment_ref.is_none());
}

#[actix_web::test]
#[serial]
async fn checkout_rejects_bad_input() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let product = app.add_product("Notion Kit", 99_000, None).await;
  let mut hidden = app.add_product("Retired Pack", 10_000, None).await;
  hidden.is_active = false;
  app.store.upsert_product(&hidden).await.unwrap();
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&hidden));
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "Product not found");

  let mut unknown = checkout_body(&product);
  unknown["productId"] = json!(Uuid::new_v4());
  let (status, _) = post_checkout!(service, unknown);
  assert_eq!(status, StatusCode::NOT_FOUND);

  let mut bad_email = checkout_body(&product);
  bad_email["customer"]["email"] = json!("not-an-email");
  let (status, _) = post_checkout!(service, bad_email);
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = post_checkout!(service, json!({ "productId": "nope" }));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "Invalid payload");

  assert!(app.store.list_orders(&Default::default()).await.unwrap().is_empty());
}

#[actix_web::test]
#[serial]
async fn checkout_requires_store_settings() {
  let app = TestApp::with_settings(None).await;
  let product = app.add_product("Notion Kit", 99_000, None).await;
  let service = init_app!(app);

  let (status, _) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(app.store.list_orders(&Default::default()).await.unwrap().is_empty());
}

#[actix_web::test]
#[serial]
async fn duitku_checkout_redirects_and_stores_the_reference() {
  let fake = spawn_fake_server(vec![(
    "/api/merchant/createInvoice",
    200,
    json!({
      "statusCode": "00",
      "statusMessage": "SUCCESS",
      "reference": "DXXXX123",
      "paymentUrl": "https://pay.duitku.test/redirect?ref=DXXXX123",
    }),
  )]);
  let mut settings = settings_for(GatewayKind::Duitku);
  settings.payment.duitku = Some(DuitkuConfig {
    merchant_code: Some("M1".to_string()),
    api_key: Some("K".to_string()),
    base_url: Some(format!("{}/", fake.base_url)),
    ..Default::default()
  });
  let app = TestApp::with_settings(Some(settings)).await;
  let product = app.add_product("Prompt Bundle", 149_000, None).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body["paymentAction"],
    json!({ "type": "redirect", "url": "https://pay.duitku.test/redirect?ref=DXXXX123" })
  );

  let order_number = body["orderNumber"].as_str().unwrap();
  let order = app.store.find_order_by_number(order_number).await.unwrap().unwrap();
  assert_eq!(order.payment_ref.as_deref(), Some("DXXXX123"));
  assert_eq!(order.invoice_url.as_deref(), Some("https://pay.duitku.test/redirect?ref=DXXXX123"));

  let requests = fake.recorded();
  assert_eq!(requests.len(), 1);
  let sent = &requests[0];
  assert_eq!(sent.method, "POST");
  assert_eq!(sent.headers["x-duitku-merchantcode"], "M1");
  assert_eq!(sent.headers["x-duitku-signature"].len(), 64);
  assert!(sent.headers.contains_key("x-duitku-timestamp"));
  assert_eq!(sent.body["merchantOrderId"], order_number);
  assert_eq!(sent.body["paymentAmount"], 149_000);
  assert_eq!(sent.body["productDetails"], "Prompt Bundle");
  assert_eq!(sent.body["callbackUrl"], "https://shop.test/api/webhooks/duitku");
}

#[actix_web::test]
#[serial]
async fn gateway_failure_leaves_a_pending_order_without_reference() {
  let fake = spawn_fake_server(vec![(
    "/api/merchant/createInvoice",
    500,
    json!({ "Message": "internal" }),
  )]);
  let mut settings = settings_for(GatewayKind::Duitku);
  settings.payment.duitku = Some(DuitkuConfig {
    merchant_code: Some("M1".to_string()),
    api_key: Some("K".to_string()),
    base_url: Some(fake.base_url.clone()),
    ..Default::default()
  });
  let app = TestApp::with_settings(Some(settings)).await;
  let product = app.add_product("Prompt Bundle", 149_000, None).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].as_str().unwrap().starts_with("Payment gateway error"));

  let orders = app.store.list_orders(&Default::default()).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].status, OrderStatus::Pending);
  assert!(orders[0].payment_ref.is_none());
  assert!(orders[0].invoice_url.is_none());
}

#[actix_web::test]
#[serial]
async fn duitku_without_credentials_is_a_gateway_error() {
  let app = TestApp::with_settings(Some(settings_for(GatewayKind::Duitku))).await;
  let product = app.add_product("Prompt Bundle", 149_000, None).await;
  let service = init_app!(app);

  let (status, _) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::BAD_GATEWAY);
}

fn auto_qris_settings(worker_url: &str) -> StoreSettings {
  let mut settings = settings_for(GatewayKind::AutoQris);
  settings.payment.auto_qris = Some(AutoQrisConfig {
    worker_url: Some(worker_url.to_string()),
    api_key: Some("worker-key".to_string()),
    static_qris: Some("00020101021126STATIC".to_string()),
    callback_url: None,
  });
  settings
}

#[actix_web::test]
#[serial]
async fn auto_qris_checkout_then_verify() {
  let fake = spawn_fake_server(vec![
    (
      "/qris/generate-for-order",
      200,
      json!({
        "success": true,
        "dynamic_qris": "00020101021226DYNAMIC",
        "order_reference": "AQ-1",
        "original_amount": "79000",
        "unique_amount": "123",
        "combined_amount": "79123",
        "instructions": { "customer": "Transfer tepat Rp 79.123" },
      }),
    ),
    (
      "/notifications",
      200,
      json!({ "success": true, "data": [{ "amount_detected": "5000" }, { "amount_detected": "079123" }] }),
    ),
  ]);
  let app = TestApp::with_settings(Some(auto_qris_settings(&fake.base_url))).await;
  let product = app.add_product("Notion Kit", 99_000, Some(79_000)).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body["paymentAction"],
    json!({
      "type": "auto_qris",
      "qrString": "00020101021226DYNAMIC",
      "orderReference": "AQ-1",
      "amounts": { "original": "79000", "unique": "123", "combined": "79123" },
      "instructions": "Transfer tepat Rp 79.123",
    })
  );

  let order_number = body["orderNumber"].as_str().unwrap().to_string();
  let order = app.store.find_order_by_number(&order_number).await.unwrap().unwrap();
  assert_eq!(order.payment_ref.as_deref(), Some("AQ-1"));
  let meta: Value = serde_json::from_str(order.invoice_url.as_deref().unwrap()).unwrap();
  assert_eq!(meta["combinedAmount"], "79123");

  let generate = &fake.recorded()[0];
  assert_eq!(generate.headers["x-api-key"], "worker-key");
  assert_eq!(generate.body["staticQRIS"], "00020101021126STATIC");
  assert_eq!(generate.body["originalAmount"], "79000");
  assert_eq!(generate.body["orderRef"], order_number.as_str());
  assert_eq!(generate.body["callbackUrl"], "https://shop.test/api/webhooks/auto-qris");

  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": order_number, "combinedAmount": "5000" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Amount does not match order");
  let still_pending = app.store.find_order(order.id).await.unwrap().unwrap();
  assert_eq!(still_pending.status, OrderStatus::Pending);
  assert!(fake.recorded().iter().all(|r| r.path != "/notifications"));

  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": order_number, "combinedAmount": "079123" }))
    .to_request();
  let body: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(body, json!({ "paid": true }));

  let paid = app.store.find_order(order.id).await.unwrap().unwrap();
  assert_eq!(paid.status, OrderStatus::Paid);
  assert_eq!(paid.payment_ref.as_deref(), Some("AQ-1"));
  let tokens = app.store.tokens_for_order(order.id).await.unwrap();
  assert_eq!(tokens.len(), 1);

  // A repeated click keeps the links that were already mailed.
  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": order_number, "combinedAmount": "79123" }))
    .to_request();
  let body: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(body, json!({ "paid": true }));
  assert_eq!(app.store.tokens_for_order(order.id).await.unwrap(), tokens);
  assert_eq!(fake.recorded().iter().filter(|r| r.path == "/notifications").count(), 1);

  let poll = fake.recorded().into_iter().find(|r| r.path == "/notifications").unwrap();
  assert_eq!(poll.method, "GET");
  assert_eq!(poll.query, "limit=10");
  assert_eq!(poll.headers["x-api-key"], "worker-key");
}

#[actix_web::test]
#[serial]
async fn verify_reports_unpaid_until_the_amount_arrives() {
  let fake = spawn_fake_server(vec![
    (
      "/qris/generate-for-order",
      200,
      json!({ "success": true, "dynamic_qris": "00020101021226DYNAMIC", "combined_amount": "99456" }),
    ),
    ("/notifications", 200, json!({ "success": true, "data": [{ "amount_detected": "5000" }] })),
  ]);
  let app = TestApp::with_settings(Some(auto_qris_settings(&fake.base_url))).await;
  let product = app.add_product("Notion Kit", 99_000, None).await;
  let service = init_app!(app);

  let (_, body) = post_checkout!(service, checkout_body(&product));
  let order_number = body["orderNumber"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": order_number, "combinedAmount": "99456" }))
    .to_request();
  let body: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(body, json!({ "paid": false }));

  let order = app.store.find_order_by_number(&order_number).await.unwrap().unwrap();
  assert_eq!(order.status, OrderStatus::Pending);
  assert!(app.store.tokens_for_order(order.id).await.unwrap().is_empty());
}

#[actix_web::test]
#[serial]
async fn verify_needs_an_auto_qris_order() {
  let mut settings = settings_for(GatewayKind::ManualQris);
  settings.payment.auto_qris = auto_qris_settings("http://127.0.0.1:9").payment.auto_qris;
  let app = TestApp::with_settings(Some(settings)).await;
  let product = app.add_product("Notion Kit", 99_000, None).await;
  let service = init_app!(app);

  let (_, body) = post_checkout!(service, checkout_body(&product));
  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": body["orderNumber"], "combinedAmount": "99000" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Order has no Auto QRIS amount");
}

#[actix_web::test]
#[serial]
async fn verify_rejects_unknown_orders_and_blank_amounts() {
  let app = TestApp::with_settings(Some(auto_qris_settings("http://127.0.0.1:9"))).await;
  let service = init_app!(app);

  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": "INV-MISSING", "combinedAmount": "79123" }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::post()
    .uri("/api/payments/auto-qris/verify")
    .set_json(json!({ "orderNumber": "INV-MISSING", "combinedAmount": " " }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn stub_gateways_redirect_to_the_configured_url() {
  let mut settings = settings_for(GatewayKind::Midtrans);
  settings.payment.payment_action_url = Some("https://pay.example/checkout".to_string());
  let app = TestApp::with_settings(Some(settings)).await;
  let product = app.add_product("Brand Pack", 249_000, None).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["paymentGateway"], "midtrans");
  assert_eq!(body["paymentAction"], json!({ "type": "redirect", "url": "https://pay.example/checkout" }));

  let app = TestApp::with_settings(Some(settings_for(GatewayKind::Stripe))).await;
  let product = app.add_product("Brand Pack", 249_000, None).await;
  let service = init_app!(app);
  let (_, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(body["paymentAction"]["url"], "#");
}

#[actix_web::test]
#[serial]
async fn unmapped_gateway_returns_no_action() {
  let app = TestApp::with_settings(Some(settings_for(GatewayKind::Other("paypal".to_string())))).await;
  let product = app.add_product("Brand Pack", 249_000, None).await;
  let service = init_app!(app);

  let (status, body) = post_checkout!(service, checkout_body(&product));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["paymentGateway"], "paypal");
  assert!(body.get("paymentAction").is_none());

  let order = app
    .store
    .find_order_by_number(body["orderNumber"].as_str().unwrap())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(order.payment_gateway, GatewayKind::Other("paypal".to_string()));
}

#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use chrono::Utc;
use common::{TestApp, ADMIN_TOKEN};
use digistore::models::{CustomerSnapshot, Order, OrderStatus, StoreSettings};
use digistore::services::orders::{self, CheckoutRequest, PaymentUpdate};
use digistore::store::Store;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

fn bearer() -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
}

async fn place_order(app: &TestApp, title: &str, price: i64) -> Order {
  let product = app.add_product(title, price, None).await;
  let response = orders::checkout(
    &app.state,
    CheckoutRequest {
      product_id: product.id,
      customer: CustomerSnapshot {
        name: "Rina".to_string(),
        email: "rina@example.com".to_string(),
        phone: None,
      },
    },
    Utc::now(),
  )
  .await
  .unwrap();
  app.store.find_order(response.order_id).await.unwrap().unwrap()
}

async fn mark_paid(app: &TestApp, order: &Order) {
  let update = PaymentUpdate {
    order_number: order.order_number.clone(),
    status: OrderStatus::Paid,
    payment_ref: None,
    invoice_url: None,
  };
  orders::apply_payment_update(&app.state, update, Utc::now()).await.unwrap();
}

#[actix_web::test]
#[serial]
async fn admin_routes_require_the_staff_token() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let service = init_app!(app);

  let req = test::TestRequest::get().uri("/api/admin/orders").to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Unauthorized");

  let req = test::TestRequest::get()
    .uri("/api/admin/metrics")
    .insert_header((header::AUTHORIZATION, "Bearer wrong-token"))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/api/admin/orders")
    .insert_header(bearer())
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
async fn orders_are_listed_and_filtered_by_status() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let first = place_order(&app, "Notion Kit", 99_000).await;
  let second = place_order(&app, "Prompt Bundle", 149_000).await;
  mark_paid(&app, &first).await;
  let service = init_app!(app);

  let req = test::TestRequest::get()
    .uri("/api/admin/orders")
    .insert_header(bearer())
    .to_request();
  let all: Value = test::read_body_json(test::call_service(&service, req).await).await;
  let numbers: Vec<&str> = all
    .as_array()
    .unwrap()
    .iter()
    .map(|o| o["orderNumber"].as_str().unwrap())
    .collect();
  assert_eq!(numbers.len(), 2);
  assert!(numbers.contains(&first.order_number.as_str()));
  assert!(numbers.contains(&second.order_number.as_str()));

  let req = test::TestRequest::get()
    .uri("/api/admin/orders?status=paid")
    .insert_header(bearer())
    .to_request();
  let paid: Value = test::read_body_json(test::call_service(&service, req).await).await;
  let paid = paid.as_array().unwrap();
  assert_eq!(paid.len(), 1);
  assert_eq!(paid[0]["orderNumber"], first.order_number.as_str());
  assert_eq!(paid[0]["status"], "paid");

  let req = test::TestRequest::get()
    .uri("/api/admin/orders?status=shipped")
    .insert_header(bearer())
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[serial]
async fn staff_can_mark_an_order_paid() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let order = place_order(&app, "Brand Pack", 249_000).await;
  let service = init_app!(app);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "status": "paid", "paymentRef": "manual-transfer-7" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["status"], "paid");
  assert_eq!(body["paymentRef"], "manual-transfer-7");

  assert_eq!(app.store.tokens_for_order(order.id).await.unwrap().len(), 1);
  assert_eq!(app.mailer.wait_for(1).await.len(), 1);
}

#[actix_web::test]
#[serial]
async fn reference_edits_and_resends() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let order = place_order(&app, "Brand Pack", 249_000).await;
  mark_paid(&app, &order).await;
  app.mailer.wait_for(1).await;
  let tokens_before = app.store.tokens_for_order(order.id).await.unwrap();
  let service = init_app!(app);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "invoiceUrl": "https://invoices.example/77" }))
    .to_request();
  let body: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(body["invoiceUrl"], "https://invoices.example/77");
  assert_eq!(body["status"], "paid");
  assert_eq!(app.store.tokens_for_order(order.id).await.unwrap(), tokens_before);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "resendEmail": true }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);
  assert_eq!(app.mailer.wait_for(2).await.len(), 2);
}

#[actix_web::test]
#[serial]
async fn paid_with_resend_mails_one_receipt() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let order = place_order(&app, "Brand Pack", 249_000).await;
  let service = init_app!(app);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "status": "paid", "resendEmail": true }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);
  assert_eq!(app.mailer.wait_for(1).await.len(), 1);
  tokio::time::sleep(std::time::Duration::from_millis(50)).await;
  assert_eq!(app.mailer.sent.lock().len(), 1);

  // Already paid: settlement stays quiet, so the explicit resend goes out.
  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "status": "paid", "resendEmail": true }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::OK);
  assert_eq!(app.mailer.wait_for(2).await.len(), 2);
  tokio::time::sleep(std::time::Duration::from_millis(50)).await;
  assert_eq!(app.mailer.sent.lock().len(), 2);
}

#[actix_web::test]
#[serial]
async fn invalid_edits_are_rejected() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let order = place_order(&app, "Brand Pack", 249_000).await;
  let service = init_app!(app);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "invoiceUrl": "not a url" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Invalid payload");

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", order.id))
    .insert_header(bearer())
    .set_json(json!({ "total": 1 }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::put()
    .uri(&format!("/api/admin/orders/{}", Uuid::new_v4()))
    .insert_header(bearer())
    .set_json(json!({ "status": "paid" }))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::get()
    .uri("/api/admin/orders/not-a-uuid")
    .insert_header(bearer())
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);

  let unchanged = app.store.find_order(order.id).await.unwrap().unwrap();
  assert_eq!(unchanged.status, OrderStatus::Pending);
  assert!(unchanged.invoice_url.is_none());
}

#[actix_web::test]
#[serial]
async fn metrics_summarize_paid_orders() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let kit = place_order(&app, "Notion Kit", 100_000).await;
  let pack = place_order(&app, "Brand Pack", 300_000).await;
  place_order(&app, "Prompt Bundle", 50_000).await;
  place_order(&app, "Prompt Bundle Two", 50_000).await;
  mark_paid(&app, &kit).await;
  mark_paid(&app, &pack).await;
  let service = init_app!(app);

  let req = test::TestRequest::get()
    .uri("/api/admin/metrics")
    .insert_header(bearer())
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;

  assert_eq!(body["totalOrders"], 4);
  assert_eq!(body["paidOrders"], 2);
  assert_eq!(body["revenue30d"], 400_000);
  assert_eq!(body["revenue7d"], 400_000);
  assert_eq!(body["conversionRate"], 0.5);
  assert_eq!(body["avgOrderValue"], 200_000.0);
  assert_eq!(body["topProducts"][0]["title"], "Brand Pack");
  assert_eq!(body["topProducts"].as_array().unwrap().len(), 2);
  assert_eq!(body["orderTrend"].as_array().unwrap().len(), 4);
}

#[actix_web::test]
#[serial]
async fn public_catalog_by_id_and_slug() {
  let app = TestApp::with_settings(Some(StoreSettings::default())).await;
  let product = app.add_product("Notion Kit", 99_000, Some(79_000)).await;
  let mut retired = app.add_product("Old Kit", 10_000, None).await;
  retired.is_active = false;
  app.store.upsert_product(&retired).await.unwrap();
  let service = init_app!(app);

  let req = test::TestRequest::get().uri("/api/products").to_request();
  let listed: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
  assert_eq!(listed[0]["slug"], "notion-kit");
  assert_eq!(listed[0]["salePrice"], 79_000);
  assert!(listed[0].get("fileKey").is_none());

  let req = test::TestRequest::get().uri("/api/products/notion-kit").to_request();
  let by_slug: Value = test::read_body_json(test::call_service(&service, req).await).await;
  assert_eq!(by_slug["id"], json!(product.id));

  let req = test::TestRequest::get()
    .uri(&format!("/api/products/{}", retired.id))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);
}

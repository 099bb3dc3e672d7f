use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, checkout_handlers, download_handlers, payment_handlers, product_handlers, webhook_handlers,
};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn invalid_payload(err: impl std::fmt::Display) -> actix_web::Error {
  tracing::debug!(error = %err, "Rejected request payload.");
  AppError::Validation("Invalid payload".to_string()).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| invalid_payload(err)))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| invalid_payload(err)))
    .app_data(web::PathConfig::default().error_handler(|_err, _req| AppError::NotFound("Not found".to_string()).into()))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("/{id_or_slug}", web::get().to(product_handlers::get_product_handler)),
        )
        .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
        .service(
          web::scope("/webhooks")
            .route("/duitku", web::post().to(webhook_handlers::duitku_webhook_handler))
            .route("/auto-qris", web::post().to(webhook_handlers::auto_qris_webhook_handler))
            .route("/auto-qris", web::get().to(webhook_handlers::auto_qris_ping_handler))
            .route("/{source}", web::post().to(webhook_handlers::redirect_webhook_handler)),
        )
        .route(
          "/payments/auto-qris/verify",
          web::post().to(payment_handlers::verify_auto_qris_handler),
        )
        .route("/download/{token}", web::get().to(download_handlers::download_handler))
        .service(
          web::scope("/admin")
            .route("/orders", web::get().to(admin_handlers::list_orders_handler))
            .route("/orders/{id}", web::get().to(admin_handlers::get_order_handler))
            .route("/orders/{id}", web::put().to(admin_handlers::update_order_handler))
            .route("/metrics", web::get().to(admin_handlers::metrics_handler)),
        ),
    );
}

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products(true).await?;
  Ok(HttpResponse::Ok().json(products))
}

/// Looks a product up by id, or by slug when the segment is not a UUID.
#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let key = path.into_inner();
  let product = match Uuid::parse_str(&key) {
    Ok(id) => app_state.store.get_product(id).await?,
    Err(_) => app_state
      .store
      .list_products(true)
      .await?
      .into_iter()
      .find(|p| p.slug == key),
  };

  match product.filter(|p| p.is_active) {
    Some(product) => Ok(HttpResponse::Ok().json(product)),
    None => Err(AppError::NotFound("Product not found".to_string())),
  }
}

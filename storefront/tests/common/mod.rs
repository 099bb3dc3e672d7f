#![allow(dead_code, unused_macros)]

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use async_trait::async_trait;
use chrono::Utc;
use digistore::config::AppConfig;
use digistore::errors::{AppError, Result};
use digistore::models::{Product, StoreSettings};
use digistore::services::auth_service;
use digistore::services::mailer::{Mailer, OutgoingEmail, SentEmailInfo};
use digistore::state::AppState;
use digistore::store::{MemoryStore, Store};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

pub const APP_BASE_URL: &str = "https://shop.test";
pub const ADMIN_TOKEN: &str = "staff-token-for-tests";

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

static ADMIN_HASH: Lazy<String> = Lazy::new(|| auth_service::hash_token(ADMIN_TOKEN).unwrap());

/// Captures every email instead of sending it. `fail` makes every send error.
#[derive(Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<OutgoingEmail>>,
  pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<SentEmailInfo> {
    if self.fail {
      return Err(AppError::Email("mail provider unavailable".to_string()));
    }
    self.sent.lock().push(email.clone());
    Ok(SentEmailInfo {
      to: email.to.clone(),
      subject: email.subject.clone(),
      message_id: format!("test_{}", Uuid::new_v4()),
    })
  }
}

impl RecordingMailer {
  /// Polls until `count` emails have been captured or a second has passed.
  pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
    for _ in 0..100 {
      if self.sent.lock().len() >= count {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    self.sent.lock().clone()
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
  pub async fn with_settings(settings: Option<StoreSettings>) -> Self {
    Self::build(settings, RecordingMailer::default()).await
  }

  pub async fn build(settings: Option<StoreSettings>, mailer: RecordingMailer) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    if let Some(settings) = settings {
      store.save_settings(&settings).await.unwrap();
    }

    let mut config = AppConfig::for_base_url(APP_BASE_URL);
    config.admin_token_hash = Some(ADMIN_HASH.clone());

    let mailer = Arc::new(mailer);
    let state = AppState::new(store.clone(), Arc::new(config), mailer.clone()).unwrap();
    Self { state, store, mailer }
  }

  pub async fn add_product(&self, title: &str, price: i64, sale_price: Option<i64>) -> Product {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      slug: title.to_lowercase().replace(' ', "-"),
      title: title.to_string(),
      description: None,
      price,
      sale_price,
      is_active: true,
      file_key: format!("products/{}.zip", Uuid::new_v4()),
      created_at: now,
      updated_at: now,
    };
    self.store.upsert_product(&product).await.unwrap();
    product
  }
}

/// Builds the actix service under test.
macro_rules! init_app {
  ($test_app:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($test_app.state.clone()))
        .configure(digistore::web::configure_app_routes),
    )
    .await
  };
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub path: String,
  pub query: String,
  pub headers: HashMap<String, String>,
  pub body: Value,
}

struct FakeState {
  routes: HashMap<String, (u16, Value)>,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A local HTTP server standing in for a gateway or the QRIS worker.
pub struct FakeServer {
  pub base_url: String,
  pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeServer {
  pub fn recorded(&self) -> Vec<RecordedRequest> {
    self.requests.lock().clone()
  }
}

async fn fake_handler(req: HttpRequest, body: web::Bytes, state: web::Data<FakeState>) -> HttpResponse {
  state.requests.lock().push(RecordedRequest {
    method: req.method().to_string(),
    path: req.path().to_string(),
    query: req.query_string().to_string(),
    headers: req
      .headers()
      .iter()
      .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
      .collect(),
    body: serde_json::from_slice(&body).unwrap_or(Value::Null),
  });

  match state.routes.get(req.path()) {
    Some((status, response)) => HttpResponse::build(StatusCode::from_u16(*status).unwrap()).json(response),
    None => HttpResponse::NotFound().json(serde_json::json!({ "error": "no such route" })),
  }
}

/// Serves `routes` (path to status and JSON body) on an ephemeral port.
pub fn spawn_fake_server(routes: Vec<(&str, u16, Value)>) -> FakeServer {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();
  let requests = Arc::new(Mutex::new(Vec::new()));
  let state = web::Data::new(FakeState {
    routes: routes
      .into_iter()
      .map(|(path, status, body)| (path.to_string(), (status, body)))
      .collect(),
    requests: requests.clone(),
  });

  let server = HttpServer::new(move || App::new().app_data(state.clone()).default_service(web::to(fake_handler)))
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
  actix_web::rt::spawn(server);

  FakeServer {
    base_url: format!("http://127.0.0.1:{}", port),
    requests,
  }
}

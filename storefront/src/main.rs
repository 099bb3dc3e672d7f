use anyhow::Context;
use actix_web::{web, App, HttpServer};
use digistore::config::AppConfig;
use digistore::services::{auth_service, mailer};
use digistore::state::AppState;
use digistore::store::PgStore;
use digistore::{seed, web::configure_app_routes};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  // `digistore-server hash-admin-token <token>` prints the ADMIN_TOKEN_HASH value.
  let args: Vec<String> = std::env::args().collect();
  if args.get(1).map(String::as_str) == Some("hash-admin-token") {
    let token = args.get(2).context("usage: digistore-server hash-admin-token <token>")?;
    println!("{}", auth_service::hash_token(token)?);
    return Ok(());
  }

  tracing::info!("Starting storefront server...");
  let config = Arc::new(AppConfig::from_env().context("failed to load configuration")?);

  let pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&config.database_url)
    .await
    .context("failed to connect to the database")?;
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .context("failed to run migrations")?;
  tracing::info!("Database ready.");

  let store = Arc::new(PgStore::new(pool));
  if config.seed_db {
    let seeded = seed::seed_defaults(&*store).await?;
    tracing::info!(seeded, "Database seeding finished.");
  }

  let mailer = mailer::mailer_from_config(&config, reqwest::Client::new());
  let app_state = AppState::new(store, config.clone(), mailer)?;

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  tracing::info!(address = %server_address, "Binding HTTP server.");

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  Ok(())
}

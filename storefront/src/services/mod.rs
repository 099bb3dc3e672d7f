pub mod auth_service;
pub mod downloads;
pub mod mailer;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod receipts;
pub mod storage;
pub mod tokens;

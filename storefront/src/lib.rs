//! Digital-goods storefront: checkout, payment gateways, settlement and
//! token-gated downloads.

pub mod config;
pub mod errors;
pub mod gateways;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
pub mod webhooks;

pub mod admin_handlers;
pub mod checkout_handlers;
pub mod download_handlers;
pub mod payment_handlers;
pub mod product_handlers;
pub mod webhook_handlers;

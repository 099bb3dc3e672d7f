//! Domain records and the typed JSON blobs stored alongside them.

pub mod download_token;
pub mod order;
pub mod product;
pub mod settings;

pub use download_token::DownloadToken;
pub use order::{CustomerSnapshot, Order, OrderItem, OrderStatus};
pub use product::Product;
pub use settings::{
  AutoQrisConfig, DownloadPolicy, DuitkuConfig, GatewayKind, ManualConfig, PaymentSettings, StorageSettings,
  StoreSettings,
};

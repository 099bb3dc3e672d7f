//! Admin dashboard figures over the last 30 days of orders.

use crate::errors::Result;
use crate::models::{Order, OrderStatus};
use crate::store::{OrderFilter, Store};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
  pub product_id: Uuid,
  pub title: String,
  pub count: u64,
  pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
  pub date: DateTime<Utc>,
  pub total: i64,
  pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
  pub revenue_today: i64,
  pub revenue_7d: i64,
  pub revenue_30d: i64,
  pub total_orders: i64,
  pub paid_orders: i64,
  pub conversion_rate: f64,
  pub avg_order_value: f64,
  pub top_products: Vec<ProductSales>,
  pub order_trend: Vec<TrendPoint>,
}

/// `recent` must hold the orders created in the last 30 days, newest first.
/// Counts are all-time.
pub fn compute(recent: &[Order], total_orders: i64, paid_orders: i64, now: DateTime<Utc>) -> DashboardMetrics {
  let start_today = now
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|midnight| midnight.and_utc())
    .unwrap_or(now);
  let start_7d = now - Duration::days(7);

  let paid: Vec<&Order> = recent.iter().filter(|o| o.status == OrderStatus::Paid).collect();
  let revenue_since = |start: DateTime<Utc>| -> i64 {
    paid.iter().filter(|o| o.created_at >= start).map(|o| o.total).sum()
  };
  let revenue_30d: i64 = paid.iter().map(|o| o.total).sum();

  let mut sales: HashMap<Uuid, ProductSales> = HashMap::new();
  for order in &paid {
    for item in &order.items {
      let entry = sales.entry(item.product_id).or_insert_with(|| ProductSales {
        product_id: item.product_id,
        title: item.title.clone(),
        count: 0,
        revenue: 0,
      });
      entry.count += 1;
      entry.revenue += item.price;
    }
  }
  let mut top_products: Vec<ProductSales> = sales.into_values().collect();
  top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.title.cmp(&b.title)));
  top_products.truncate(TOP_PRODUCTS);

  DashboardMetrics {
    revenue_today: revenue_since(start_today),
    revenue_7d: revenue_since(start_7d),
    revenue_30d,
    total_orders,
    paid_orders,
    conversion_rate: if total_orders > 0 {
      paid_orders as f64 / total_orders as f64
    } else {
      0.0
    },
    avg_order_value: if paid_orders > 0 {
      revenue_30d as f64 / paid_orders as f64
    } else {
      0.0
    },
    top_products,
    order_trend: recent
      .iter()
      .map(|o| TrendPoint {
        date: o.created_at,
        total: o.total,
        status: o.status,
      })
      .collect(),
  }
}

#[tracing::instrument(name = "metrics::dashboard", skip(store))]
pub async fn dashboard_metrics(store: &dyn Store, now: DateTime<Utc>) -> Result<DashboardMetrics> {
  let filter = OrderFilter {
    from: Some(now - Duration::days(30)),
    ..Default::default()
  };
  let recent = store.list_orders(&filter).await?;
  let total_orders = store.count_orders(None).await?;
  let paid_orders = store.count_orders(Some(OrderStatus::Paid)).await?;
  Ok(compute(&recent, total_orders, paid_orders, now))
}

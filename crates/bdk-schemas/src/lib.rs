//! Shared record types for the backdesk order service.
//!
//! Everything here is `Serialize + Deserialize` so it can travel over the
//! daemon's JSON API unchanged. No business logic lives in this crate; the
//! domain rules are in `bdk-orders` and row mapping in `bdk-db`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative catalog row for one product: current price, on-hand stock,
/// and whether the product is sellable at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock_qty: i64,
    pub active: bool,
}

/// One row of the status catalog. `next_status` is the default
/// forward-advance target; `None` marks a step that can only be left by an
/// explicit jump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status_code: i32,
    pub name: String,
    pub next_status: Option<i32>,
    pub is_terminal: bool,
}

/// Order header. All amounts are integer cents; `total_cents` is always
/// `subtotal + tax + delivery + adjustment`, recomputed server-side and
/// additionally enforced by a CHECK constraint in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: i64,
    pub user_ref: String,
    pub status_code: i32,
    pub qty_total: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_cents: i64,
    pub adjustment_cents: i64,
    pub total_cents: i64,
    pub invoice_number: Option<String>,
    pub tax_id: Option<String>,
    pub delivery_lat: Option<f64>,
    pub delivery_lng: Option<f64>,
    pub device_type: Option<String>,
    pub observation: Option<String>,
    pub acted_by: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Order line. The unit price is captured at order time and never changes
/// afterwards, independent of later catalog price edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub line_id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub qty: i64,
    pub unit_price_cents: i64,
    pub warehouse_id: Option<i64>,
}

/// One append-only activity row; one is written per status transition,
/// including the initial creation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: i64,
    pub order_id: i64,
    pub status_code: i32,
    pub acted_by: String,
    pub observation: Option<String>,
    pub ts_utc: DateTime<Utc>,
}

/// Full read model for one order: header, lines, audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order: OrderRecord,
    pub lines: Vec<OrderLineRecord>,
    pub activity: Vec<ActivityRecord>,
}

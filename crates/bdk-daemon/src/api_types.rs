//! Request and response types for all bdk-daemon HTTP endpoints.
//!
//! JSON-encoded by Axum; scenario tests decode the bodies generically. No
//! business logic lives here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bdk_orders::reconcile::ReviewedLine;

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    /// Whether the backing store answered a ping just now.
    pub store_ok: bool,
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// Body of every error response. `req_id` also appears in the server log at
/// the moment of failure so a support report can be correlated with the
/// logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub req_id: Uuid,
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderItem {
    pub product_id: i64,
    pub qty: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub status_code: i32,
    pub items: Vec<CreateOrderItem>,
    #[serde(default)]
    pub user_ref: Option<String>,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub delivery_cents: i64,
    #[serde(default)]
    pub adjustment_cents: i64,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub delivery_lat: Option<f64>,
    #[serde(default)]
    pub delivery_lng: Option<f64>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub acted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub detail_count: i64,
    pub activity_id: i64,
}

// ---------------------------------------------------------------------------
// POST /v1/orders/:order_id/transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionBody {
    /// Omitted = advance to the configured next status; present = jump to
    /// this destination.
    #[serde(default)]
    pub destination_status: Option<i32>,
    pub observation: String,
    #[serde(default)]
    pub acted_by: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /v1/cart/validate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartValidateItem {
    pub id: i64,
    pub price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartValidateRequest {
    pub items: Vec<CartValidateItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartTotals {
    pub server_subtotal_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartValidateResponse {
    /// True only when every line came back `ok`.
    pub ok: bool,
    pub items: Vec<ReviewedLine>,
    pub totals: CartTotals,
}

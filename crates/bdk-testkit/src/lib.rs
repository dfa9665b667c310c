//! Deterministic in-memory backend for scenario tests.
//!
//! [`MemStore`] implements the same all-or-nothing contract as the Postgres
//! backend: persistence checks every collapsed stock adjustment before the
//! first write, so a rejected order leaves no trace. No I/O, no randomness
//! beyond what callers seed. Running id counters start at 1.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use bdk_orders::draft::OrderDraft;
use bdk_orders::store::{OrderReceipt, OrderStore, StoreError};
use bdk_schemas::{
    ActivityRecord, OrderLineRecord, OrderProjection, OrderRecord, ProductRecord, StatusRecord,
};

#[derive(Default)]
struct MemInner {
    products: BTreeMap<i64, ProductRecord>,
    statuses: BTreeMap<i32, StatusRecord>,
    orders: BTreeMap<i64, OrderRecord>,
    lines: Vec<OrderLineRecord>,
    activity: Vec<ActivityRecord>,
    next_order_id: i64,
    next_line_id: i64,
    next_activity_id: i64,
}

/// In-memory [`OrderStore`] with the default status catalog optionally
/// pre-seeded.
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemInner {
                next_order_id: 1,
                next_line_id: 1,
                next_activity_id: 1,
                ..MemInner::default()
            }),
        }
    }

    /// New store seeded with the default seven-status catalog:
    /// 1 NEW → 2 PREPARING → 3 READY → 4 DISPATCHED → 5 DELIVERED
    /// (terminal), 6 REJECTED (terminal), 7 ON_HOLD (no next).
    pub fn with_default_statuses() -> Self {
        let store = Self::new();
        let seed = [
            (1, "NEW", Some(2), false),
            (2, "PREPARING", Some(3), false),
            (3, "READY", Some(4), false),
            (4, "DISPATCHED", Some(5), false),
            (5, "DELIVERED", None, true),
            (6, "REJECTED", None, true),
            (7, "ON_HOLD", None, false),
        ];
        {
            let mut inner = store.inner.lock().unwrap();
            for (status_code, name, next_status, is_terminal) in seed {
                inner.statuses.insert(
                    status_code,
                    StatusRecord {
                        status_code,
                        name: name.to_string(),
                        next_status,
                        is_terminal,
                    },
                );
            }
        }
        store
    }

    pub fn insert_product(
        &self,
        product_id: i64,
        name: &str,
        price_cents: i64,
        stock_qty: i64,
        active: bool,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.products.insert(
            product_id,
            ProductRecord {
                product_id,
                name: name.to_string(),
                price_cents,
                stock_qty,
                active,
            },
        );
    }

    /// Current stock level, for assertions.
    pub fn stock_of(&self, product_id: i64) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner.products.get(&product_id).map(|p| p.stock_qty)
    }

    /// Number of activity rows recorded for one order, for assertions.
    pub fn activity_count(&self, order_id: i64) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .activity
            .iter()
            .filter(|a| a.order_id == order_id)
            .count()
    }
}

#[async_trait]
impl OrderStore for MemStore {
    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<ProductRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn fetch_status(&self, status_code: i32) -> Result<Option<StatusRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.statuses.get(&status_code).cloned())
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<OrderProjection>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let Some(order) = inner.orders.get(&order_id).cloned() else {
            return Ok(None);
        };
        let lines = inner
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect();
        let activity = inner
            .activity
            .iter()
            .filter(|a| a.order_id == order_id)
            .cloned()
            .collect();
        Ok(Some(OrderProjection {
            order,
            lines,
            activity,
        }))
    }

    async fn persist_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        // All checks before the first write; a rejection must leave no trace.
        for adj in &draft.adjustments {
            let Some(product) = inner.products.get(&adj.product_id) else {
                return Err(StoreError::UnknownProduct);
            };
            if product.stock_qty < adj.qty {
                return Err(StoreError::InsufficientStock {
                    product_id: adj.product_id,
                });
            }
        }

        for adj in &draft.adjustments {
            let product = inner
                .products
                .get_mut(&adj.product_id)
                .expect("checked above");
            product.stock_qty -= adj.qty;
        }

        let order_id = inner.next_order_id;
        inner.next_order_id += 1;
        inner.orders.insert(
            order_id,
            OrderRecord {
                order_id,
                user_ref: draft.user_ref.clone(),
                status_code: draft.status_code,
                qty_total: draft.qty_total,
                subtotal_cents: draft.subtotal_cents,
                tax_cents: draft.tax_cents,
                delivery_cents: draft.delivery_cents,
                adjustment_cents: draft.adjustment_cents,
                total_cents: draft.total_cents,
                invoice_number: draft.invoice_number.clone(),
                tax_id: draft.tax_id.clone(),
                delivery_lat: draft.delivery_lat,
                delivery_lng: draft.delivery_lng,
                device_type: draft.device_type.clone(),
                observation: draft.observation.clone(),
                acted_by: draft.acted_by.clone(),
                created_at_utc: Utc::now(),
            },
        );

        for item in &draft.items {
            let line_id = inner.next_line_id;
            inner.next_line_id += 1;
            inner.lines.push(OrderLineRecord {
                line_id,
                order_id,
                product_id: item.product_id,
                qty: item.qty,
                unit_price_cents: item.unit_price_cents,
                warehouse_id: item.warehouse_id,
            });
        }

        let activity_id = inner.next_activity_id;
        inner.next_activity_id += 1;
        inner.activity.push(ActivityRecord {
            activity_id,
            order_id,
            status_code: draft.status_code,
            acted_by: draft.acted_by.clone(),
            observation: draft.observation.clone(),
            ts_utc: Utc::now(),
        });

        Ok(OrderReceipt {
            order_id,
            detail_count: draft.items.len() as i64,
            activity_id,
        })
    }

    async fn apply_transition(
        &self,
        order_id: i64,
        destination: i32,
        observation: &str,
        acted_by: &str,
    ) -> Result<OrderRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let activity_id = inner.next_activity_id;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Err(StoreError::OrderNotFound { order_id });
        };
        order.status_code = destination;
        order.observation = Some(observation.to_string());
        order.acted_by = acted_by.to_string();
        let updated = order.clone();

        inner.next_activity_id += 1;
        inner.activity.push(ActivityRecord {
            activity_id,
            order_id,
            status_code: destination,
            acted_by: acted_by.to_string(),
            observation: Some(observation.to_string()),
            ts_utc: Utc::now(),
        });

        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Backend seam: the persistent store the order service talks to.
//!
//! Implementations must provide all-or-nothing semantics for
//! [`OrderStore::persist_order`] and [`OrderStore::apply_transition`]:
//! the Postgres backend runs one transaction per call (`bdk-db`), the test
//! backend takes a single lock and checks everything up front
//! (`bdk-testkit`). Concurrent stock safety lives entirely behind this
//! trait — callers never see a partially-applied decrement.

use async_trait::async_trait;
use bdk_schemas::{OrderProjection, OrderRecord, ProductRecord, StatusRecord};

use crate::draft::OrderDraft;

/// What a successful creation returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: i64,
    pub detail_count: i64,
    pub activity_id: i64,
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Store-level failure.
#[derive(Debug)]
pub enum StoreError {
    /// A stock decrement would drive a product's quantity negative. The
    /// whole persistence attempt is rejected; nothing was written.
    InsufficientStock { product_id: i64 },
    /// A line referenced a product id the catalog does not know.
    UnknownProduct,
    /// The order id does not exist.
    OrderNotFound { order_id: i64 },
    /// Anything else the backend reported.
    Backend(anyhow::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Backend(err.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InsufficientStock { product_id } => {
                write!(f, "insufficient stock for product {product_id}")
            }
            StoreError::UnknownProduct => write!(f, "order references an unknown product"),
            StoreError::OrderNotFound { order_id } => write!(f, "order {order_id} not found"),
            StoreError::Backend(err) => write!(f, "store backend error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(err) => {
                let source: &(dyn std::error::Error + Send + Sync + 'static) = err.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

/// The persistent backend for orders, the product catalog and the status
/// catalog.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Batched authoritative lookup for the given product ids. Ids with no
    /// catalog row are simply absent from the result.
    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<ProductRecord>, StoreError>;

    /// Look up one status-catalog row.
    async fn fetch_status(&self, status_code: i32) -> Result<Option<StatusRecord>, StoreError>;

    /// Full read model for one order: header, lines, activity trail.
    async fn fetch_order(&self, order_id: i64) -> Result<Option<OrderProjection>, StoreError>;

    /// Atomically persist header + lines + collapsed stock decrements + the
    /// initial activity row. On any error no write survives and stock is
    /// untouched.
    async fn persist_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, StoreError>;

    /// Atomically set the order's status and append one activity row.
    /// Returns the updated header.
    async fn apply_transition(
        &self,
        order_id: i64,
        destination: i32,
        observation: &str,
        acted_by: &str,
    ) -> Result<OrderRecord, StoreError>;

    /// Cheap connectivity probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

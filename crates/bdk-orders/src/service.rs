//! Service entry points: the three operations the daemon exposes, tying the
//! pure domain rules to a store backend.
//!
//! Each operation runs exactly once — no retries anywhere. A request-scoped
//! correlation id is minted per creation for log correlation only; it never
//! reaches the store.

use std::collections::HashMap;

use anyhow::anyhow;
use bdk_schemas::{OrderRecord, ProductRecord};
use tracing::{info, warn};
use uuid::Uuid;

use crate::draft::{build_draft, DraftError, NewOrderRequest, FALLBACK_ACTOR};
use crate::reconcile::{reconcile_cart, CartLine, CartReview};
use crate::store::{OrderReceipt, OrderStore, StoreError};
use crate::transition::{plan_advance, plan_jump, TransitionError, TransitionRequest};

// ---------------------------------------------------------------------------
// create_order
// ---------------------------------------------------------------------------

/// Failure of the create-order entry point.
#[derive(Debug)]
pub enum CreateError {
    /// Rejected before any write; no side effects occurred.
    Invalid(DraftError),
    /// The requested creation status is not in the catalog.
    UnknownStatus { status_code: i32 },
    Store(StoreError),
}

impl std::fmt::Display for CreateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateError::Invalid(err) => write!(f, "invalid order: {err}"),
            CreateError::UnknownStatus { status_code } => {
                write!(f, "unknown status code {status_code}")
            }
            CreateError::Store(err) => write!(f, "create order failed: {err}"),
        }
    }
}

impl std::error::Error for CreateError {}

/// Validate the request, compute totals, and persist the order atomically
/// (header + lines + collapsed stock decrements + initial activity row).
pub async fn create_order(
    store: &dyn OrderStore,
    request: NewOrderRequest,
) -> Result<OrderReceipt, CreateError> {
    let correlation_id = Uuid::new_v4();

    let draft = build_draft(request).map_err(CreateError::Invalid)?;

    let status = store
        .fetch_status(draft.status_code)
        .await
        .map_err(CreateError::Store)?;
    if status.is_none() {
        return Err(CreateError::UnknownStatus {
            status_code: draft.status_code,
        });
    }

    info!(
        %correlation_id,
        status_code = draft.status_code,
        lines = draft.items.len(),
        qty_total = draft.qty_total,
        total_cents = draft.total_cents,
        "creating order"
    );

    let receipt = store.persist_order(&draft).await.map_err(|err| {
        warn!(%correlation_id, error = %err, "order persistence rejected");
        CreateError::Store(err)
    })?;

    info!(%correlation_id, order_id = receipt.order_id, "order created");
    Ok(receipt)
}

// ---------------------------------------------------------------------------
// transition_order
// ---------------------------------------------------------------------------

/// Failure of the transition entry point.
#[derive(Debug)]
pub enum TransitionFailure {
    OrderNotFound { order_id: i64 },
    UnknownDestination { destination: i32 },
    /// The status machine refused the move.
    Illegal(TransitionError),
    Store(StoreError),
}

impl std::fmt::Display for TransitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionFailure::OrderNotFound { order_id } => {
                write!(f, "order {order_id} not found")
            }
            TransitionFailure::UnknownDestination { destination } => {
                write!(f, "unknown destination status {destination}")
            }
            TransitionFailure::Illegal(err) => write!(f, "{err}"),
            TransitionFailure::Store(err) => write!(f, "transition failed: {err}"),
        }
    }
}

impl std::error::Error for TransitionFailure {}

/// Move an order to its next status (advance) or to an explicit destination
/// (jump), appending one activity row in the same atomic unit.
///
/// Observation emptiness is a caller-side rule enforced at the HTTP
/// boundary; this function accepts whatever observation it is given.
pub async fn transition_order(
    store: &dyn OrderStore,
    order_id: i64,
    request: TransitionRequest,
    observation: &str,
    acted_by: Option<&str>,
) -> Result<OrderRecord, TransitionFailure> {
    let projection = store
        .fetch_order(order_id)
        .await
        .map_err(TransitionFailure::Store)?
        .ok_or(TransitionFailure::OrderNotFound { order_id })?;

    let current_code = projection.order.status_code;
    let current = store
        .fetch_status(current_code)
        .await
        .map_err(TransitionFailure::Store)?
        .ok_or_else(|| {
            // The header's FK makes this unreachable on the Postgres
            // backend; a hand-seeded test store can still get here.
            TransitionFailure::Store(StoreError::Backend(anyhow!(
                "order {order_id} references status {current_code} missing from the catalog"
            )))
        })?;

    let destination = match request {
        TransitionRequest::Advance => {
            plan_advance(&current).map_err(TransitionFailure::Illegal)?
        }
        TransitionRequest::Jump { destination } => {
            let dest_row = store
                .fetch_status(destination)
                .await
                .map_err(TransitionFailure::Store)?
                .ok_or(TransitionFailure::UnknownDestination { destination })?;
            plan_jump(&current, &dest_row).map_err(TransitionFailure::Illegal)?
        }
    };

    let acted_by = match acted_by {
        Some(actor) if !actor.trim().is_empty() => actor,
        _ => FALLBACK_ACTOR,
    };

    let updated = store
        .apply_transition(order_id, destination, observation, acted_by)
        .await
        .map_err(|err| match err {
            StoreError::OrderNotFound { order_id } => {
                TransitionFailure::OrderNotFound { order_id }
            }
            other => TransitionFailure::Store(other),
        })?;

    info!(
        order_id,
        from = current_code,
        to = destination,
        acted_by,
        "order status changed"
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// review_cart
// ---------------------------------------------------------------------------

/// Fetch the authoritative rows for every distinct product in the cart and
/// classify each line. Read-only; never mutates catalog state.
pub async fn review_cart(
    store: &dyn OrderStore,
    cart: &[CartLine],
) -> Result<CartReview, StoreError> {
    let mut ids: Vec<i64> = cart.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let rows = store.fetch_products(&ids).await?;
    let catalog: HashMap<i64, ProductRecord> =
        rows.into_iter().map(|p| (p.product_id, p)).collect();

    Ok(reconcile_cart(cart, &catalog))
}

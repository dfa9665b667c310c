//! Order draft building.
//!
//! Everything that can be decided before touching the store: validate the
//! submitted items, compute the authoritative totals, resolve fallback
//! identities, and collapse duplicate products into one ledger adjustment
//! each. Totals are always recomputed here — amounts claimed by the caller
//! never survive into the draft.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Acting-user placeholder when the caller supplies none.
pub const FALLBACK_ACTOR: &str = "backoffice";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One submitted line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub qty: i64,
    pub unit_price_cents: i64,
    pub warehouse_id: Option<i64>,
}

/// Creation request, already decoded from the wire. Missing amounts default
/// to zero at the DTO layer.
#[derive(Debug, Clone, Default)]
pub struct NewOrderRequest {
    pub status_code: i32,
    pub items: Vec<NewOrderItem>,
    pub user_ref: Option<String>,
    pub tax_cents: i64,
    pub delivery_cents: i64,
    pub adjustment_cents: i64,
    pub invoice_number: Option<String>,
    pub tax_id: Option<String>,
    pub delivery_lat: Option<f64>,
    pub delivery_lng: Option<f64>,
    pub device_type: Option<String>,
    pub observation: Option<String>,
    pub acted_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A single all-or-nothing stock decrement for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: i64,
    pub qty: i64,
}

/// Fully validated order with server-computed totals, ready for atomic
/// persistence.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub status_code: i32,
    pub user_ref: String,
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
    pub items: Vec<NewOrderItem>,
    /// One decrement per distinct product, duplicate lines summed, ordered
    /// by product id.
    pub adjustments: Vec<StockAdjustment>,
}

/// Rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    EmptyItems,
    NonPositiveQty { product_id: i64, qty: i64 },
    NegativePrice { product_id: i64, unit_price_cents: i64 },
}

impl std::fmt::Display for DraftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DraftError::EmptyItems => write!(f, "order must contain at least one item"),
            DraftError::NonPositiveQty { product_id, qty } => {
                write!(f, "product {product_id}: quantity must be positive, got {qty}")
            }
            DraftError::NegativePrice {
                product_id,
                unit_price_cents,
            } => {
                write!(
                    f,
                    "product {product_id}: unit price must not be negative, got {unit_price_cents}"
                )
            }
        }
    }
}

impl std::error::Error for DraftError {}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Validate the request and compute the draft.
///
/// `subtotal = Σ(qty × price)`, `qty_total = Σ qty`,
/// `total = subtotal + tax + delivery + adjustment`. A blank or missing
/// user reference becomes an opaque `guest-<uuid>`; a blank or missing
/// acting user becomes [`FALLBACK_ACTOR`].
pub fn build_draft(req: NewOrderRequest) -> Result<OrderDraft, DraftError> {
    if req.items.is_empty() {
        return Err(DraftError::EmptyItems);
    }

    let mut qty_total = 0i64;
    let mut subtotal_cents = 0i64;
    let mut collapsed: BTreeMap<i64, i64> = BTreeMap::new();

    for item in &req.items {
        if item.qty <= 0 {
            return Err(DraftError::NonPositiveQty {
                product_id: item.product_id,
                qty: item.qty,
            });
        }
        if item.unit_price_cents < 0 {
            return Err(DraftError::NegativePrice {
                product_id: item.product_id,
                unit_price_cents: item.unit_price_cents,
            });
        }
        qty_total += item.qty;
        subtotal_cents += item.qty * item.unit_price_cents;
        *collapsed.entry(item.product_id).or_insert(0) += item.qty;
    }

    let total_cents = subtotal_cents + req.tax_cents + req.delivery_cents + req.adjustment_cents;

    let user_ref = req
        .user_ref
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("guest-{}", Uuid::new_v4().simple()));
    let acted_by = req
        .acted_by
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ACTOR.to_string());

    let adjustments = collapsed
        .into_iter()
        .map(|(product_id, qty)| StockAdjustment { product_id, qty })
        .collect();

    Ok(OrderDraft {
        status_code: req.status_code,
        user_ref,
        qty_total,
        subtotal_cents,
        tax_cents: req.tax_cents,
        delivery_cents: req.delivery_cents,
        adjustment_cents: req.adjustment_cents,
        total_cents,
        invoice_number: req.invoice_number,
        tax_id: req.tax_id,
        delivery_lat: req.delivery_lat,
        delivery_lng: req.delivery_lng,
        device_type: req.device_type,
        observation: req.observation,
        acted_by,
        items: req.items,
        adjustments,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: i64, qty: i64, unit_price_cents: i64) -> NewOrderItem {
        NewOrderItem {
            product_id,
            qty,
            unit_price_cents,
            warehouse_id: None,
        }
    }

    #[test]
    fn totals_are_recomputed_from_items() {
        let draft = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(10, 2, 150), item(11, 1, 300)],
            tax_cents: 48,
            delivery_cents: 100,
            adjustment_cents: -50,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(draft.qty_total, 3);
        assert_eq!(draft.subtotal_cents, 600);
        assert_eq!(
            draft.total_cents,
            draft.subtotal_cents + draft.tax_cents + draft.delivery_cents + draft.adjustment_cents
        );
        assert_eq!(draft.total_cents, 698);
    }

    #[test]
    fn duplicate_products_collapse_into_one_adjustment() {
        let draft = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(1, 2, 50), item(1, 3, 50)],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            draft.adjustments,
            vec![StockAdjustment {
                product_id: 1,
                qty: 5
            }],
            "one decrement of 5, not two of 2 and 3"
        );
        assert_eq!(draft.items.len(), 2, "lines themselves stay uncollapsed");
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let err = build_draft(NewOrderRequest {
            status_code: 1,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, DraftError::EmptyItems);
    }

    #[test]
    fn non_positive_qty_is_rejected() {
        let err = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(7, 0, 100)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            DraftError::NonPositiveQty {
                product_id: 7,
                qty: 0
            }
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(7, 1, -1)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            DraftError::NegativePrice {
                product_id: 7,
                unit_price_cents: -1
            }
        );
    }

    #[test]
    fn missing_user_ref_gets_opaque_guest_id() {
        let draft = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(1, 1, 100)],
            ..Default::default()
        })
        .unwrap();
        assert!(draft.user_ref.starts_with("guest-"));
        assert_eq!(draft.acted_by, FALLBACK_ACTOR);
    }

    #[test]
    fn blank_user_ref_is_treated_as_missing() {
        let draft = build_draft(NewOrderRequest {
            status_code: 1,
            items: vec![item(1, 1, 100)],
            user_ref: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(draft.user_ref.starts_with("guest-"));
    }
}

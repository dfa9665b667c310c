//! Cart/stock reconciliation.
//!
//! Re-validates a client-submitted cart against the authoritative product
//! catalog before checkout. Classification priority per line, first match
//! wins: not_found > inactive > insufficient_stock > price_mismatch > ok.
//!
//! Stock-limited and price-corrected lines still contribute to the server
//! subtotal: the subtotal answers "what would this cart cost after
//! auto-correction", not "what is currently valid". Only the `ok` flag says
//! whether the cart can go through unchanged.

use std::collections::HashMap;

use bdk_schemas::ProductRecord;
use serde::{Deserialize, Serialize};

/// Client-claimed cart line. Request-scoped; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub claimed_price_cents: i64,
    pub requested_qty: i64,
}

/// Outcome for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineVerdict {
    Ok,
    /// The authoritative price differs from the claim. The catalog price
    /// always wins.
    PriceMismatch { db_price_cents: i64 },
    /// Requested quantity exceeds available stock (including stock zero).
    InsufficientStock {
        available_qty: i64,
        suggested_qty: i64,
    },
    Inactive,
    NotFound,
}

impl LineVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, LineVerdict::Ok)
    }
}

/// One classified cart line plus its contribution to the server subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedLine {
    pub product_id: i64,
    pub requested_qty: i64,
    #[serde(flatten)]
    pub verdict: LineVerdict,
    pub charge_cents: i64,
}

/// Whole-cart review result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartReview {
    /// True only when every line is `ok`.
    pub ok: bool,
    pub lines: Vec<ReviewedLine>,
    pub server_subtotal_cents: i64,
}

/// Classify every cart line against the catalog rows and compute the
/// server-trusted subtotal. `catalog` is keyed by product id; ids absent
/// from the map classify as `not_found`.
pub fn reconcile_cart(cart: &[CartLine], catalog: &HashMap<i64, ProductRecord>) -> CartReview {
    let mut lines = Vec::with_capacity(cart.len());
    let mut server_subtotal_cents = 0i64;
    let mut all_ok = true;

    for line in cart {
        let (verdict, charge_cents) = match catalog.get(&line.product_id) {
            None => (LineVerdict::NotFound, 0),
            Some(p) if !p.active => (LineVerdict::Inactive, 0),
            Some(p) if line.requested_qty > p.stock_qty => {
                // Charge only what can actually be fulfilled.
                let suggested_qty = line.requested_qty.min(p.stock_qty);
                (
                    LineVerdict::InsufficientStock {
                        available_qty: p.stock_qty,
                        suggested_qty,
                    },
                    p.price_cents * suggested_qty,
                )
            }
            Some(p) if line.claimed_price_cents != p.price_cents => (
                LineVerdict::PriceMismatch {
                    db_price_cents: p.price_cents,
                },
                p.price_cents * line.requested_qty,
            ),
            Some(p) => (LineVerdict::Ok, p.price_cents * line.requested_qty),
        };

        all_ok &= verdict.is_ok();
        server_subtotal_cents += charge_cents;
        lines.push(ReviewedLine {
            product_id: line.product_id,
            requested_qty: line.requested_qty,
            verdict,
            charge_cents,
        });
    }

    CartReview {
        ok: all_ok,
        lines,
        server_subtotal_cents,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

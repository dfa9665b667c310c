//! Order domain for the backdesk back office.
//!
//! Three operations live here, each split into a pure rules layer and an
//! orchestrated service entry point over the [`store::OrderStore`] seam:
//!
//! * **order creation** — [`draft`] validates items, recomputes totals and
//!   collapses duplicate products; [`service::create_order`] persists the
//!   result atomically through the store.
//! * **status machine** — [`status`] + [`transition`] encode the lifecycle
//!   codes (1 new, 2–4 in progress, 5 delivered, 6 rejected, 7 on hold)
//!   and the advance/jump planning rules; [`service::transition_order`]
//!   applies a planned move plus its activity row as one unit.
//! * **cart reconciliation** — [`reconcile`] classifies client-claimed
//!   lines against authoritative catalog rows; [`service::review_cart`]
//!   feeds it from a batched store lookup.
//!
//! Stock atomicity (no partial decrements, never negative) is a hard
//! contract on the store implementation, not re-checked here.

pub mod draft;
pub mod reconcile;
pub mod service;
pub mod status;
pub mod store;
pub mod transition;

pub use status::{OrderStatus, STATUS_DELIVERED, STATUS_NEW, STATUS_ON_HOLD, STATUS_REJECTED};
pub use store::{OrderReceipt, OrderStore, StoreError};
pub use transition::{TransitionError, TransitionRequest};

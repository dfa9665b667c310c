//! Status transition planning.
//!
//! Pure functions over status-catalog rows: callers resolve the relevant
//! rows, planning decides the destination, the store applies it. Two
//! transition kinds exist:
//!
//! * *advance* — follow the current status's configured `next_status`;
//! * *jump*    — move to an explicit destination chosen by the operator.
//!
//! Terminal orders (DELIVERED, REJECTED) refuse both kinds. ON_HOLD has no
//! configured next, so an advance on a held order fails and the operator
//! must jump to a concrete destination instead. A jump to the status the
//! order already occupies is rejected, which is what keeps `ON_HOLD →
//! ON_HOLD` unrepresentable.

use bdk_schemas::StatusRecord;

use crate::status::OrderStatus;

// ---------------------------------------------------------------------------
// TransitionRequest
// ---------------------------------------------------------------------------

/// The two kinds of status transition an operator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRequest {
    /// Follow the configured `next_status` of the current step.
    Advance,
    /// Move to an explicit destination status code.
    Jump { destination: i32 },
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when a transition cannot legally be applied in the current
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The order sits in a terminal status; nothing may move it.
    Terminal { current: i32 },
    /// Advance requested but the catalog configures no next step.
    NoNextConfigured { current: i32 },
    /// Jump requested to the status the order is already in.
    SameStatus { current: i32 },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::Terminal { current } => {
                write!(f, "order is in terminal status {current}; no transition allowed")
            }
            TransitionError::NoNextConfigured { current } => {
                write!(f, "status {current} has no configured next step; pick a destination")
            }
            TransitionError::SameStatus { current } => {
                write!(f, "order is already in status {current}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Refuse any transition out of a terminal status. The fixed codes are
/// checked through [`OrderStatus`]; operator-configured extras are honored
/// via the catalog's own `is_terminal` flag.
fn assert_live(current: &StatusRecord) -> Result<(), TransitionError> {
    if current.is_terminal || OrderStatus::from_code(current.status_code).is_terminal() {
        return Err(TransitionError::Terminal {
            current: current.status_code,
        });
    }
    Ok(())
}

/// Plan an advance: resolve the configured `next_status` of the current
/// step.
///
/// # Errors
/// [`TransitionError::Terminal`] for DELIVERED/REJECTED orders,
/// [`TransitionError::NoNextConfigured`] when the catalog leaves
/// `next_status` unset (ON_HOLD, dead-end steps).
pub fn plan_advance(current: &StatusRecord) -> Result<i32, TransitionError> {
    assert_live(current)?;
    current
        .next_status
        .ok_or(TransitionError::NoNextConfigured {
            current: current.status_code,
        })
}

/// Plan a jump to an explicit, already-resolved destination row.
///
/// Any cataloged destination is legal — the fixed finalize (→5), reject
/// (→6) and hold (→7) shortcuts are jumps like any other — except the
/// status the order is already in.
pub fn plan_jump(
    current: &StatusRecord,
    destination: &StatusRecord,
) -> Result<i32, TransitionError> {
    assert_live(current)?;
    if destination.status_code == current.status_code {
        return Err(TransitionError::SameStatus {
            current: current.status_code,
        });
    }
    Ok(destination.status_code)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

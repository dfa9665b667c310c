//! Shared runtime state for bdk-daemon.
//!
//! Handlers receive `State<AppState>` from Axum. The state is cheap to
//! clone: the store sits behind an `Arc` and build info is static.

use std::sync::Arc;

use bdk_orders::store::OrderStore;

/// Static build metadata included in health / status responses.
#[derive(Clone, Copy, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The order/catalog backend — Postgres in production, the in-memory
    /// testkit store in scenario tests.
    pub store: Arc<dyn OrderStore>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            build: BuildInfo {
                service: "bdk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

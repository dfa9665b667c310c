//! Axum router and all HTTP handlers for bdk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers stay thin: decode, call the order service,
//! map the outcome to a status code. Every error path responds with the
//! JSON envelope `{message, req_id}` and logs the same `req_id`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info};
use uuid::Uuid;

use bdk_orders::draft::{NewOrderItem, NewOrderRequest};
use bdk_orders::reconcile::CartLine;
use bdk_orders::service::{self, CreateError, TransitionFailure};
use bdk_orders::store::StoreError;
use bdk_orders::transition::TransitionRequest;

use crate::api_types::{
    CartTotals, CartValidateRequest, CartValidateResponse, CreateOrderRequest,
    CreateOrderResponse, ErrorResponse, HealthResponse, StatusResponse, TransitionBody,
};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/orders", post(create_order))
        .route("/v1/orders/:order_id", get(get_order))
        .route("/v1/orders/:order_id/transition", post(transition_order))
        .route("/v1/cart/validate", post(validate_cart))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Handler-level failure, converted into the `{message, req_id}` envelope.
/// A fresh `req_id` is minted at response time and written to the log with
/// the message, so operators can match a support report to the server logs.
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let req_id = Uuid::new_v4();
        let status = self.status();
        if status.is_server_error() {
            error!(%req_id, %status, message = self.message(), "request failed");
        } else {
            info!(%req_id, %status, message = self.message(), "request refused");
        }
        (
            status,
            Json(ErrorResponse {
                message: self.message().to_string(),
                req_id,
            }),
        )
            .into_response()
    }
}

impl From<CreateError> for ApiError {
    fn from(err: CreateError) -> Self {
        match err {
            CreateError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            CreateError::UnknownStatus { status_code } => {
                ApiError::BadRequest(format!("unknown status code {status_code}"))
            }
            CreateError::Store(StoreError::InsufficientStock { product_id }) => {
                ApiError::Conflict(format!("insufficient stock for product {product_id}"))
            }
            CreateError::Store(StoreError::UnknownProduct) => {
                ApiError::BadRequest("order references an unknown product".to_string())
            }
            CreateError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TransitionFailure> for ApiError {
    fn from(err: TransitionFailure) -> Self {
        match err {
            TransitionFailure::OrderNotFound { order_id } => {
                ApiError::NotFound(format!("order {order_id} not found"))
            }
            TransitionFailure::UnknownDestination { destination } => {
                ApiError::BadRequest(format!("unknown destination status {destination}"))
            }
            TransitionFailure::Illegal(e) => ApiError::Conflict(e.to_string()),
            TransitionFailure::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<AppState>) -> impl IntoResponse {
    let store_ok = st.store.ping().await.is_ok();
    (
        StatusCode::OK,
        Json(StatusResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            store_ok,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = NewOrderRequest {
        status_code: body.status_code,
        items: body
            .items
            .into_iter()
            .map(|i| NewOrderItem {
                product_id: i.product_id,
                qty: i.qty,
                unit_price_cents: i.price_cents,
                warehouse_id: i.warehouse_id,
            })
            .collect(),
        user_ref: body.user_ref,
        tax_cents: body.tax_cents,
        delivery_cents: body.delivery_cents,
        adjustment_cents: body.adjustment_cents,
        invoice_number: body.invoice_number,
        tax_id: body.tax_id,
        delivery_lat: body.delivery_lat,
        delivery_lng: body.delivery_lng,
        device_type: body.device_type,
        observation: body.observation,
        acted_by: body.acted_by,
    };

    let receipt = service::create_order(st.store.as_ref(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: receipt.order_id,
            detail_count: receipt.detail_count,
            activity_id: receipt.activity_id,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:order_id
// ---------------------------------------------------------------------------

pub(crate) async fn get_order(
    State(st): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let projection = st
        .store
        .fetch_order(order_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id} not found")))?;

    Ok((StatusCode::OK, Json(projection)))
}

// ---------------------------------------------------------------------------
// POST /v1/orders/:order_id/transition
// ---------------------------------------------------------------------------

pub(crate) async fn transition_order(
    State(st): State<AppState>,
    Path(order_id): Path<i64>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.observation.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "observation must not be empty".to_string(),
        ));
    }

    let request = match body.destination_status {
        Some(destination) => TransitionRequest::Jump { destination },
        None => TransitionRequest::Advance,
    };

    let updated = service::transition_order(
        st.store.as_ref(),
        order_id,
        request,
        &body.observation,
        body.acted_by.as_deref(),
    )
    .await?;

    Ok((StatusCode::OK, Json(updated)))
}

// ---------------------------------------------------------------------------
// POST /v1/cart/validate
// ---------------------------------------------------------------------------

pub(crate) async fn validate_cart(
    State(st): State<AppState>,
    Json(body): Json<CartValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.items.is_empty() {
        return Err(ApiError::BadRequest(
            "cart item list must not be empty".to_string(),
        ));
    }
    for item in &body.items {
        if item.quantity <= 0 {
            return Err(ApiError::BadRequest(format!(
                "product {}: quantity must be positive, got {}",
                item.id, item.quantity
            )));
        }
        if item.price_cents < 0 {
            return Err(ApiError::BadRequest(format!(
                "product {}: price must not be negative, got {}",
                item.id, item.price_cents
            )));
        }
    }

    let cart: Vec<CartLine> = body
        .items
        .iter()
        .map(|i| CartLine {
            product_id: i.id,
            claimed_price_cents: i.price_cents,
            requested_qty: i.quantity,
        })
        .collect();

    let review = service::review_cart(st.store.as_ref(), &cart)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        Json(CartValidateResponse {
            ok: review.ok,
            items: review.lines,
            totals: CartTotals {
                server_subtotal_cents: review.server_subtotal_cents,
            },
        }),
    ))
}

//! Postgres backend for the backdesk order service.
//!
//! Pool setup reads `BACKDESK_DATABASE_URL`; migrations are embedded via
//! `sqlx::migrate!`. [`PgStore`] implements the `OrderStore` seam with one
//! transaction per mutating call, so a failure anywhere in a
//! creation/transition sequence aborts the whole thing — there is no
//! compensating-delete path to maintain.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use bdk_orders::draft::OrderDraft;
use bdk_orders::store::{OrderReceipt, OrderStore, StoreError};
use bdk_schemas::{
    ActivityRecord, OrderLineRecord, OrderProjection, OrderRecord, ProductRecord, StatusRecord,
};

pub const ENV_DB_URL: &str = "BACKDESK_DATABASE_URL";

/// Connect to Postgres using BACKDESK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Insert a small demo product set with fixed ids; idempotent. Returns the
/// number of rows actually inserted.
pub async fn seed_demo(pool: &PgPool) -> Result<u64> {
    let res = sqlx::query(
        r#"
        insert into products (product_id, name, price_cents, stock_qty, active) values
            (1, 'mole poblano jar',    5000,  40, true),
            (2, 'tortilla press',     30000,  12, true),
            (3, 'salsa verde pack',    1200, 200, true),
            (4, 'clay comal',         18000,   0, true),
            (5, 'discontinued molino', 9900,   7, false)
        on conflict (product_id) do nothing
        "#,
    )
    .execute(pool)
    .await
    .context("seed_demo insert failed")?;

    // Keep the serial in step with the explicit ids.
    sqlx::query(
        "select setval(pg_get_serial_sequence('products','product_id'), \
         (select coalesce(max(product_id), 1) from products))",
    )
    .execute(pool)
    .await
    .context("seed_demo setval failed")?;

    Ok(res.rows_affected())
}

/// Detect a Postgres foreign key violation by constraint name.
fn is_fk_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some(constraint)
                // Postgres foreign_key_violation is 23503.
                || db_err.code().as_deref() == Some("23503")
                    && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const ORDER_COLUMNS: &str = "order_id, user_ref, status_code, qty_total, subtotal_cents, \
     tax_cents, delivery_cents, adjustment_cents, total_cents, invoice_number, tax_id, \
     delivery_lat, delivery_lng, device_type, observation, acted_by, created_at_utc";

fn map_order_row(row: &PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        order_id: row.try_get("order_id")?,
        user_ref: row.try_get("user_ref")?,
        status_code: row.try_get("status_code")?,
        qty_total: row.try_get("qty_total")?,
        subtotal_cents: row.try_get("subtotal_cents")?,
        tax_cents: row.try_get("tax_cents")?,
        delivery_cents: row.try_get("delivery_cents")?,
        adjustment_cents: row.try_get("adjustment_cents")?,
        total_cents: row.try_get("total_cents")?,
        invoice_number: row.try_get("invoice_number")?,
        tax_id: row.try_get("tax_id")?,
        delivery_lat: row.try_get("delivery_lat")?,
        delivery_lng: row.try_get("delivery_lng")?,
        device_type: row.try_get("device_type")?,
        observation: row.try_get("observation")?,
        acted_by: row.try_get("acted_by")?,
        created_at_utc: row.try_get("created_at_utc")?,
    })
}

fn map_product_row(row: &PgRow) -> Result<ProductRecord> {
    Ok(ProductRecord {
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        price_cents: row.try_get("price_cents")?,
        stock_qty: row.try_get("stock_qty")?,
        active: row.try_get("active")?,
    })
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// Postgres-backed [`OrderStore`]. Cheap to clone; shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<ProductRecord>, StoreError> {
        let rows = sqlx::query(
            "select product_id, name, price_cents, stock_qty, active \
             from products where product_id = any($1) order by product_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend(anyhow::Error::new(e).context("fetch_products failed")))?;

        rows.iter()
            .map(|row| map_product_row(row).map_err(StoreError::backend))
            .collect()
    }

    async fn fetch_status(&self, status_code: i32) -> Result<Option<StatusRecord>, StoreError> {
        let row = sqlx::query(
            "select status_code, name, next_status, is_terminal \
             from order_statuses where status_code = $1",
        )
        .bind(status_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(anyhow::Error::new(e).context("fetch_status failed")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StatusRecord {
            status_code: row.try_get("status_code").map_err(StoreError::backend)?,
            name: row.try_get("name").map_err(StoreError::backend)?,
            next_status: row.try_get("next_status").map_err(StoreError::backend)?,
            is_terminal: row.try_get("is_terminal").map_err(StoreError::backend)?,
        }))
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<OrderProjection>, StoreError> {
        let header = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from orders where order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(anyhow::Error::new(e).context("fetch_order failed")))?;

        let Some(header) = header else {
            return Ok(None);
        };
        let order = map_order_row(&header).map_err(StoreError::backend)?;

        let line_rows = sqlx::query(
            "select line_id, order_id, product_id, qty, unit_price_cents, warehouse_id \
             from order_lines where order_id = $1 order by line_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("fetch_order lines failed"))
        })?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for row in &line_rows {
            lines.push(OrderLineRecord {
                line_id: row.try_get("line_id").map_err(StoreError::backend)?,
                order_id: row.try_get("order_id").map_err(StoreError::backend)?,
                product_id: row.try_get("product_id").map_err(StoreError::backend)?,
                qty: row.try_get("qty").map_err(StoreError::backend)?,
                unit_price_cents: row
                    .try_get("unit_price_cents")
                    .map_err(StoreError::backend)?,
                warehouse_id: row.try_get("warehouse_id").map_err(StoreError::backend)?,
            });
        }

        let activity_rows = sqlx::query(
            "select activity_id, order_id, status_code, acted_by, observation, ts_utc \
             from order_activity where order_id = $1 order by activity_id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("fetch_order activity failed"))
        })?;

        let mut activity = Vec::with_capacity(activity_rows.len());
        for row in &activity_rows {
            activity.push(ActivityRecord {
                activity_id: row.try_get("activity_id").map_err(StoreError::backend)?,
                order_id: row.try_get("order_id").map_err(StoreError::backend)?,
                status_code: row.try_get("status_code").map_err(StoreError::backend)?,
                acted_by: row.try_get("acted_by").map_err(StoreError::backend)?,
                observation: row.try_get("observation").map_err(StoreError::backend)?,
                ts_utc: row.try_get("ts_utc").map_err(StoreError::backend)?,
            });
        }

        Ok(Some(OrderProjection {
            order,
            lines,
            activity,
        }))
    }

    async fn persist_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("persist_order begin failed"))
        })?;

        let order_id: i64 = sqlx::query_scalar(
            r#"
            insert into orders (
              user_ref, status_code, qty_total, subtotal_cents, tax_cents,
              delivery_cents, adjustment_cents, total_cents, invoice_number,
              tax_id, delivery_lat, delivery_lng, device_type, observation, acted_by
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
            )
            returning order_id
            "#,
        )
        .bind(&draft.user_ref)
        .bind(draft.status_code)
        .bind(draft.qty_total)
        .bind(draft.subtotal_cents)
        .bind(draft.tax_cents)
        .bind(draft.delivery_cents)
        .bind(draft.adjustment_cents)
        .bind(draft.total_cents)
        .bind(&draft.invoice_number)
        .bind(&draft.tax_id)
        .bind(draft.delivery_lat)
        .bind(draft.delivery_lng)
        .bind(&draft.device_type)
        .bind(&draft.observation)
        .bind(&draft.acted_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("order header insert failed"))
        })?;

        // All lines in one batch.
        let product_ids: Vec<i64> = draft.items.iter().map(|i| i.product_id).collect();
        let qtys: Vec<i64> = draft.items.iter().map(|i| i.qty).collect();
        let prices: Vec<i64> = draft.items.iter().map(|i| i.unit_price_cents).collect();
        let warehouses: Vec<Option<i64>> = draft.items.iter().map(|i| i.warehouse_id).collect();

        sqlx::query(
            r#"
            insert into order_lines (order_id, product_id, qty, unit_price_cents, warehouse_id)
            select $1, t.product_id, t.qty, t.unit_price_cents, t.warehouse_id
            from unnest($2::bigint[], $3::bigint[], $4::bigint[], $5::bigint[])
              as t(product_id, qty, unit_price_cents, warehouse_id)
            "#,
        )
        .bind(order_id)
        .bind(&product_ids)
        .bind(&qtys)
        .bind(&prices)
        .bind(&warehouses)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_fk_violation(&e, "order_lines_product_id_fkey") {
                StoreError::UnknownProduct
            } else {
                StoreError::backend(anyhow::Error::new(e).context("order lines insert failed"))
            }
        })?;

        // Collapsed stock decrements: the conditional update refuses to go
        // negative, and an abort here rolls back the header and lines too.
        for adj in &draft.adjustments {
            let res = sqlx::query(
                "update products set stock_qty = stock_qty - $2 \
                 where product_id = $1 and stock_qty >= $2",
            )
            .bind(adj.product_id)
            .bind(adj.qty)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                StoreError::backend(anyhow::Error::new(e).context("stock decrement failed"))
            })?;

            if res.rows_affected() == 0 {
                return Err(StoreError::InsufficientStock {
                    product_id: adj.product_id,
                });
            }
        }

        let activity_id: i64 = sqlx::query_scalar(
            "insert into order_activity (order_id, status_code, acted_by, observation) \
             values ($1, $2, $3, $4) returning activity_id",
        )
        .bind(order_id)
        .bind(draft.status_code)
        .bind(&draft.acted_by)
        .bind(&draft.observation)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("initial activity insert failed"))
        })?;

        tx.commit().await.map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("persist_order commit failed"))
        })?;

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
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("apply_transition begin failed"))
        })?;

        let row = sqlx::query(&format!(
            "update orders set status_code = $2, observation = $3, acted_by = $4 \
             where order_id = $1 returning {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(destination)
        .bind(observation)
        .bind(acted_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("order status update failed"))
        })?;

        let Some(row) = row else {
            return Err(StoreError::OrderNotFound { order_id });
        };
        let updated = map_order_row(&row).map_err(StoreError::backend)?;

        sqlx::query(
            "insert into order_activity (order_id, status_code, acted_by, observation) \
             values ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(destination)
        .bind(acted_by)
        .bind(observation)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("activity append failed"))
        })?;

        tx.commit().await.map_err(|e| {
            StoreError::backend(anyhow::Error::new(e).context("apply_transition commit failed"))
        })?;

        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("select 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(anyhow::Error::new(e).context("ping failed")))?;
        Ok(())
    }
}

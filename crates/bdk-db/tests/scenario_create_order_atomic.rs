//! Creation atomicity against a real Postgres.
//!
//! DB-backed test. Skips if BACKDESK_DATABASE_URL is not set.

use bdk_orders::draft::{build_draft, NewOrderItem, NewOrderRequest};
use bdk_orders::store::{OrderStore, StoreError};
use bdk_orders::STATUS_NEW;
use bdk_db::PgStore;

async fn setup() -> anyhow::Result<Option<PgStore>> {
    if std::env::var(bdk_db::ENV_DB_URL).is_err() {
        eprintln!("SKIP: BACKDESK_DATABASE_URL not set");
        return Ok(None);
    }
    let pool = bdk_db::connect_from_env().await?;
    bdk_db::migrate(&pool).await?;
    Ok(Some(PgStore::new(pool)))
}

async fn insert_product(store: &PgStore, name: &str, price_cents: i64, stock_qty: i64) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "insert into products (name, price_cents, stock_qty, active) \
         values ($1, $2, $3, true) returning product_id",
    )
    .bind(name)
    .bind(price_cents)
    .bind(stock_qty)
    .fetch_one(store.pool())
    .await?;
    Ok(id)
}

async fn stock_of(store: &PgStore, product_id: i64) -> anyhow::Result<i64> {
    let qty: i64 = sqlx::query_scalar("select stock_qty from products where product_id = $1")
        .bind(product_id)
        .fetch_one(store.pool())
        .await?;
    Ok(qty)
}

fn draft_for(product_id: i64, qty: i64, price_cents: i64) -> bdk_orders::draft::OrderDraft {
    build_draft(NewOrderRequest {
        status_code: STATUS_NEW,
        items: vec![NewOrderItem {
            product_id,
            qty,
            unit_price_cents: price_cents,
            warehouse_id: None,
        }],
        observation: Some("db scenario".to_string()),
        ..Default::default()
    })
    .expect("valid draft")
}

#[tokio::test]
async fn oversubscribed_create_leaves_no_trace() -> anyhow::Result<()> {
    let Some(store) = setup().await? else {
        return Ok(());
    };

    let product_id = insert_product(&store, "atomic-rollback probe", 700, 3).await?;

    let err = store.persist_order(&draft_for(product_id, 10, 700)).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { product_id: p } if p == product_id));

    // Transaction abort: stock unchanged, no lines reference the product.
    assert_eq!(stock_of(&store, product_id).await?, 3);
    let orphan_lines: i64 =
        sqlx::query_scalar("select count(*)::bigint from order_lines where product_id = $1")
            .bind(product_id)
            .fetch_one(store.pool())
            .await?;
    assert_eq!(orphan_lines, 0, "no detail rows may survive the rollback");

    Ok(())
}

#[tokio::test]
async fn successful_create_writes_header_lines_activity_and_decrements() -> anyhow::Result<()> {
    let Some(store) = setup().await? else {
        return Ok(());
    };

    let product_id = insert_product(&store, "happy-path probe", 700, 3).await?;

    let receipt = store.persist_order(&draft_for(product_id, 2, 700)).await?;
    assert_eq!(receipt.detail_count, 1);

    let projection = store.fetch_order(receipt.order_id).await?.expect("order exists");
    assert_eq!(projection.order.status_code, STATUS_NEW);
    assert_eq!(projection.order.subtotal_cents, 1400);
    assert_eq!(
        projection.order.total_cents,
        projection.order.subtotal_cents
            + projection.order.tax_cents
            + projection.order.delivery_cents
            + projection.order.adjustment_cents
    );
    assert_eq!(projection.lines.len(), 1);
    assert_eq!(projection.activity.len(), 1);
    assert_eq!(projection.activity[0].activity_id, receipt.activity_id);

    assert_eq!(stock_of(&store, product_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn unknown_product_is_classified_not_backend_noise() -> anyhow::Result<()> {
    let Some(store) = setup().await? else {
        return Ok(());
    };

    let err = store
        .persist_order(&draft_for(i64::MAX - 7, 1, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownProduct));

    Ok(())
}

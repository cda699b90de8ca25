//! # Stock Ledger Repository
//!
//! Per-branch unit counts, one row per `(product_id, branch_id)`, plus the
//! append-only `stock_movements` history.
//!
//! A missing row reads as zero. Writes are absolute overwrites; the caller
//! records a movement for each one inside the same transaction, so a count
//! never changes without a history row.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use motopos_core::{MovementKind, NewStockMovement, StockMovement};

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: i64,
    product_id: String,
    branch_id: String,
    kind: MovementKind,
    quantity_before: i64,
    quantity_after: i64,
    counterpart_branch_id: Option<String>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            product_id: row.product_id,
            branch_id: row.branch_id,
            kind: row.kind,
            quantity_before: row.quantity_before,
            quantity_after: row.quantity_after,
            counterpart_branch_id: row.counterpart_branch_id,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

/// Stock ledger queries. Every call runs on the caller's connection.
#[derive(Debug, Clone, Copy)]
pub struct StockRepository;

impl StockRepository {
    /// Overwrites the quantity held at a branch.
    ///
    /// Existence of the product and branch is the caller's check; the foreign
    /// keys reject anything that slips through.
    pub async fn set(
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, branch_id = %branch_id, quantity, "Setting stock");

        sqlx::query(
            r#"
            INSERT INTO product_stocks (product_id, branch_id, quantity, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (product_id, branch_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn quantity(
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: &str,
    ) -> DbResult<i64> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM product_stocks WHERE product_id = ? AND branch_id = ?",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quantity.unwrap_or(0))
    }

    pub async fn total_in(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM product_stocks WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(total)
    }

    /// Units held at a branch by live products.
    pub async fn held_in_branch(conn: &mut SqliteConnection, branch_id: &str) -> DbResult<i64> {
        let held: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(s.quantity), 0)
            FROM product_stocks s
            JOIN products p ON p.id = s.product_id
            WHERE s.branch_id = ? AND p.deleted_at IS NULL
            "#,
        )
        .bind(branch_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(held)
    }

    /// Drops every ledger row of a branch (zero rows and tombstoned products).
    pub async fn remove_branch_rows(conn: &mut SqliteConnection, branch_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM product_stocks WHERE branch_id = ?")
            .bind(branch_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Appends one movement row.
    pub async fn record(
        conn: &mut SqliteConnection,
        movement: &NewStockMovement,
        now: DateTime<Utc>,
    ) -> DbResult<StockMovement> {
        debug!(
            product_id = %movement.product_id,
            branch_id = %movement.branch_id,
            kind = movement.kind.as_str(),
            before = movement.quantity_before,
            after = movement.quantity_after,
            "Recording stock movement"
        );

        let id = sqlx::query(
            r#"
            INSERT INTO stock_movements
                (product_id, branch_id, kind, quantity_before, quantity_after,
                 counterpart_branch_id, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&movement.product_id)
        .bind(&movement.branch_id)
        .bind(movement.kind)
        .bind(movement.quantity_before)
        .bind(movement.quantity_after)
        .bind(&movement.counterpart_branch_id)
        .bind(&movement.reason)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        Ok(StockMovement {
            id,
            product_id: movement.product_id.clone(),
            branch_id: movement.branch_id.clone(),
            kind: movement.kind,
            quantity_before: movement.quantity_before,
            quantity_after: movement.quantity_after,
            counterpart_branch_id: movement.counterpart_branch_id.clone(),
            reason: movement.reason.clone(),
            created_at: now,
        })
    }

    /// History of a product, newest first, optionally for one branch.
    pub async fn movements(
        conn: &mut SqliteConnection,
        product_id: &str,
        branch_id: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, branch_id, kind, quantity_before, quantity_after,
                   counterpart_branch_id, reason, created_at
            FROM stock_movements
            WHERE product_id = ? AND (? IS NULL OR branch_id = ?)
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(StockMovement::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::{product, seeded_db, ts};
    use crate::repository::product::ProductRepository;
    use crate::Database;

    async fn read_quantity(db: &Database, product_id: &str, branch_id: &str) -> i64 {
        let mut tx = db.begin_read().await.unwrap();
        StockRepository::quantity(&mut tx, product_id, branch_id).await.unwrap()
    }

    async fn read_total(db: &Database, product_id: &str) -> i64 {
        let mut tx = db.begin_read().await.unwrap();
        StockRepository::total_in(&mut tx, product_id).await.unwrap()
    }

    fn movement(branch_id: &str, kind: MovementKind, before: i64, after: i64) -> NewStockMovement {
        NewStockMovement {
            product_id: "p1".to_string(),
            branch_id: branch_id.to_string(),
            kind,
            quantity_before: before,
            quantity_after: after,
            counterpart_branch_id: None,
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_missing_entry_reads_zero_and_set_overwrites() {
        let db = seeded_db().await;
        let mut tx = db.begin_write().await.unwrap();
        ProductRepository::insert(tx.conn(), &product("p1", "SKU-1", "2000000000011", "Clutch"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(read_quantity(&db, "p1", "branch-1").await, 0);
        assert_eq!(read_total(&db, "p1").await, 0);

        for quantity in [50, 0] {
            let mut tx = db.begin_write().await.unwrap();
            StockRepository::set(tx.conn(), "p1", "branch-1", quantity, ts())
                .await
                .unwrap();
            tx.commit().await.unwrap();
            assert_eq!(read_quantity(&db, "p1", "branch-1").await, quantity);
        }
    }

    #[tokio::test]
    async fn test_total_sums_branches_and_held_ignores_tombstones() {
        let db = seeded_db().await;
        sqlx::query(
            "INSERT INTO branches (id, code, name, created_at, updated_at) \
             VALUES ('branch-2', 'BDG-01', 'Bandung', ?, ?)",
        )
        .bind(ts())
        .bind(ts())
        .execute(db.pool())
        .await
        .unwrap();

        let mut gone = product("p2", "SKU-2", "2000000000028", "Old Part");
        let mut tx = db.begin_write().await.unwrap();
        ProductRepository::insert(tx.conn(), &product("p1", "SKU-1", "2000000000011", "Clutch"))
            .await
            .unwrap();
        ProductRepository::insert(tx.conn(), &gone).await.unwrap();
        StockRepository::set(tx.conn(), "p1", "branch-1", 7, ts()).await.unwrap();
        StockRepository::set(tx.conn(), "p1", "branch-2", 5, ts()).await.unwrap();
        StockRepository::set(tx.conn(), "p2", "branch-1", 3, ts()).await.unwrap();
        gone.deleted_at = Some(ts());
        ProductRepository::save(tx.conn(), &gone).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(read_total(&db, "p1").await, 12);

        let mut tx = db.begin_write().await.unwrap();
        assert_eq!(StockRepository::held_in_branch(tx.conn(), "branch-1").await.unwrap(), 7);
        assert_eq!(StockRepository::remove_branch_rows(tx.conn(), "branch-1").await.unwrap(), 2);
        tx.commit().await.unwrap();
        assert_eq!(read_total(&db, "p1").await, 5);
    }

    #[tokio::test]
    async fn test_unknown_branch_rejected_by_foreign_key() {
        let db = seeded_db().await;
        let mut tx = db.begin_write().await.unwrap();
        ProductRepository::insert(tx.conn(), &product("p1", "SKU-1", "2000000000011", "Clutch"))
            .await
            .unwrap();
        let err = StockRepository::set(tx.conn(), "p1", "nowhere", 1, ts())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_movements_are_listed_newest_first() {
        let db = seeded_db().await;
        let mut tx = db.begin_write().await.unwrap();
        ProductRepository::insert(tx.conn(), &product("p1", "SKU-1", "2000000000011", "Clutch"))
            .await
            .unwrap();
        let first = StockRepository::record(tx.conn(), &movement("branch-1", MovementKind::Set, 0, 10), ts())
            .await
            .unwrap();
        let mut out = movement("branch-1", MovementKind::TransferOut, 10, 4);
        out.counterpart_branch_id = Some("branch-9".to_string());
        out.reason = Some("rebalance".to_string());
        StockRepository::record(tx.conn(), &out, ts()).await.unwrap();
        StockRepository::record(tx.conn(), &movement("branch-9", MovementKind::TransferIn, 0, 6), ts())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.begin_read().await.unwrap();
        let all = StockRepository::movements(&mut tx, "p1", None, 50).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].id > all[1].id && all[1].id > all[2].id);
        assert_eq!(all[2].id, first.id);
        assert_eq!(all[1].kind, MovementKind::TransferOut);
        assert_eq!(all[1].delta(), -6);
        assert_eq!(all[1].reason.as_deref(), Some("rebalance"));
        assert_eq!(all[1].counterpart_branch_id.as_deref(), Some("branch-9"));

        let local = StockRepository::movements(&mut tx, "p1", Some("branch-1"), 50)
            .await
            .unwrap();
        assert_eq!(local.len(), 2);
        let limited = StockRepository::movements(&mut tx, "p1", None, 1).await.unwrap();
        assert_eq!(limited[0].kind, MovementKind::TransferIn);
    }

    #[tokio::test]
    async fn test_negative_movement_rejected_by_schema() {
        let db = seeded_db().await;
        let mut tx = db.begin_write().await.unwrap();
        ProductRepository::insert(tx.conn(), &product("p1", "SKU-1", "2000000000011", "Clutch"))
            .await
            .unwrap();
        let result =
            StockRepository::record(tx.conn(), &movement("branch-1", MovementKind::Adjustment, 2, -1), ts()).await;
        assert!(result.is_err());
    }
}

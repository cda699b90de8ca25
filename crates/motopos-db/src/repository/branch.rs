//! # Branch Repository
//!
//! Stores, warehouses and anything else that holds stock.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::stock::StockRepository;
use motopos_core::Branch;

const BRANCH_COLUMNS: &str = "id, code, name, address, phone, email, manager_name, \
     manager_phone, operating_hours, stock_capacity, is_active, created_at, updated_at";

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// All branches ordered by code.
    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_in(&mut conn).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Branch> {
        let mut conn = self.pool.acquire().await?;
        Self::load(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))
    }

    pub async fn list_in(conn: &mut SqliteConnection) -> DbResult<Vec<Branch>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches ORDER BY code COLLATE NOCASE");
        let branches = sqlx::query_as::<_, Branch>(&sql)
            .fetch_all(&mut *conn)
            .await?;
        Ok(branches)
    }

    pub async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Branch>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?");
        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(branch)
    }

    pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }

    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already in use
    pub async fn insert(conn: &mut SqliteConnection, branch: &Branch) -> DbResult<()> {
        debug!(code = %branch.code, "Inserting branch");

        let sql = format!(
            "INSERT INTO branches ({BRANCH_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&branch.id)
            .bind(&branch.code)
            .bind(&branch.name)
            .bind(&branch.address)
            .bind(&branch.phone)
            .bind(&branch.email)
            .bind(&branch.manager_name)
            .bind(&branch.manager_phone)
            .bind(&branch.operating_hours)
            .bind(branch.stock_capacity)
            .bind(branch.is_active)
            .bind(branch.created_at)
            .bind(branch.updated_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Writes every editable column of `branch`.
    pub async fn save(conn: &mut SqliteConnection, branch: &Branch) -> DbResult<()> {
        debug!(id = %branch.id, "Saving branch");

        let result = sqlx::query(
            r#"
            UPDATE branches SET
                code = ?,
                name = ?,
                address = ?,
                phone = ?,
                email = ?,
                manager_name = ?,
                manager_phone = ?,
                operating_hours = ?,
                stock_capacity = ?,
                is_active = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&branch.code)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(&branch.email)
        .bind(&branch.manager_name)
        .bind(&branch.manager_phone)
        .bind(&branch.operating_hours)
        .bind(branch.stock_capacity)
        .bind(branch.is_active)
        .bind(branch.updated_at)
        .bind(&branch.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", &branch.id));
        }

        Ok(())
    }

    /// Removes a branch, detaching its users and dropping its ledger rows.
    ///
    /// Whether the branch may go (no live stock) is the caller's check.
    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting branch");

        sqlx::query("UPDATE users SET branch_id = NULL WHERE branch_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        StockRepository::remove_branch_rows(conn, id).await?;
        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::ts;
    use crate::{Database, DbConfig};

    fn branch(id: &str, code: &str) -> Branch {
        Branch {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("Branch {code}"),
            address: Some("Jl. Sudirman 1".to_string()),
            phone: None,
            email: None,
            manager_name: Some("Rina".to_string()),
            manager_phone: None,
            operating_hours: Some("08:00-17:00".to_string()),
            stock_capacity: 500,
            is_active: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[tokio::test]
    async fn test_insert_save_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        BranchRepository::insert(tx.conn(), &branch("b2", "SBY-01")).await.unwrap();
        BranchRepository::insert(tx.conn(), &branch("b1", "BDG-01")).await.unwrap();
        tx.commit().await.unwrap();

        let codes: Vec<String> = db.branches().list().await.unwrap().into_iter().map(|b| b.code).collect();
        assert_eq!(codes, vec!["BDG-01", "SBY-01"]);

        let mut updated = db.branches().get("b1").await.unwrap();
        updated.is_active = false;
        updated.stock_capacity = 0;
        let mut tx = db.begin_write().await.unwrap();
        BranchRepository::save(tx.conn(), &updated).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.branches().get("b1").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_code_is_unique_case_insensitively() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        BranchRepository::insert(tx.conn(), &branch("b1", "JKT-01")).await.unwrap();
        let err = BranchRepository::insert(tx.conn(), &branch("b2", "jkt-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "code"));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        assert!(matches!(
            BranchRepository::delete_in(tx.conn(), "missing").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(!BranchRepository::exists(tx.conn(), "missing").await.unwrap());
    }
}

//! # Role Repository
//!
//! Named permission sets. Permissions are stored as a JSON array.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use motopos_core::Role;

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    permissions: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self) -> DbResult<Role> {
        Ok(Role {
            permissions: from_json("permissions", &self.permissions)?,
            id: self.id,
            name: self.name,
            description: self.description,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ROLE_COLUMNS: &str = "id, name, description, permissions, is_system, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    /// All roles, system roles first.
    pub async fn list(&self) -> DbResult<Vec<Role>> {
        let sql = format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY is_system DESC, name COLLATE NOCASE"
        );
        let rows: Vec<RoleRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(RoleRow::into_role).collect()
    }

    pub async fn get(&self, id: &str) -> DbResult<Role> {
        let mut conn = self.pool.acquire().await?;
        Self::load(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Role", id))
    }

    pub async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?");
        let row: Option<RoleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(RoleRow::into_role).transpose()
    }

    pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ? COLLATE NOCASE");
        let row: Option<RoleRow> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(RoleRow::into_role).transpose()
    }

    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name taken
    pub async fn insert(conn: &mut SqliteConnection, role: &Role) -> DbResult<()> {
        debug!(name = %role.name, is_system = role.is_system, "Inserting role");

        let sql = format!("INSERT INTO roles ({ROLE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(&role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(to_json("permissions", &role.permissions)?)
            .bind(role.is_system)
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Writes name, description and permissions. `is_system` never changes.
    pub async fn save(conn: &mut SqliteConnection, role: &Role) -> DbResult<()> {
        debug!(id = %role.id, "Saving role");

        let result = sqlx::query(
            "UPDATE roles SET name = ?, description = ?, permissions = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(to_json("permissions", &role.permissions)?)
        .bind(role.updated_at)
        .bind(&role.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", &role.id));
        }

        Ok(())
    }

    pub async fn users_with_role(conn: &mut SqliteConnection, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting role");

        let result = sqlx::query("DELETE FROM roles WHERE id = ? AND is_system = 0")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::ts;
    use crate::{Database, DbConfig};

    fn role(id: &str, name: &str, is_system: bool) -> Role {
        Role {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            permissions: vec!["products.read".to_string(), "stock.write".to_string()],
            is_system,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[tokio::test]
    async fn test_roundtrip_and_lookup_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        RoleRepository::insert(tx.conn(), &role("r1", "Stock Clerk", false)).await.unwrap();
        RoleRepository::insert(tx.conn(), &role("r0", "Admin", true)).await.unwrap();
        let found = RoleRepository::find_by_name(tx.conn(), "stock clerk").await.unwrap();
        assert_eq!(found.map(|r| r.id), Some("r1".to_string()));
        tx.commit().await.unwrap();

        let roles = db.roles().list().await.unwrap();
        assert_eq!(roles[0].name, "Admin");
        assert_eq!(roles[1].permissions, vec!["products.read", "stock.write"]);
    }

    #[tokio::test]
    async fn test_system_row_is_never_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        RoleRepository::insert(tx.conn(), &role("r0", "Admin", true)).await.unwrap();
        RoleRepository::insert(tx.conn(), &role("r1", "Temp", false)).await.unwrap();

        assert!(RoleRepository::delete_in(tx.conn(), "r0").await.is_err());
        RoleRepository::delete_in(tx.conn(), "r1").await.unwrap();
        assert!(RoleRepository::load(tx.conn(), "r0").await.unwrap().is_some());
        assert!(RoleRepository::load(tx.conn(), "r1").await.unwrap().is_none());
    }
}

//! # User Repository
//!
//! Staff accounts. The argon2 hash is read only by the login path.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use motopos_core::User;

const USER_COLUMNS: &str = "id, username, email, full_name, role_id, branch_id, is_active, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Looks up a user and their password hash (case-insensitive username).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<(User, String)>> {
        debug!(username = %username, "Looking up user");

        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ? COLLATE NOCASE"
        );
        let row: Option<CredentialRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    pub async fn exists_by_username(conn: &mut SqliteConnection, username: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    pub async fn insert(conn: &mut SqliteConnection, user: &User, password_hash: &str) -> DbResult<()> {
        debug!(username = %user.username, "Inserting user");

        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}, password_hash) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.role_id)
            .bind(&user.branch_id)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(password_hash)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::ts;
    use crate::repository::role::RoleRepository;
    use crate::{Database, DbConfig};
    use motopos_core::Role;

    #[tokio::test]
    async fn test_insert_and_find_by_username() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        RoleRepository::insert(
            tx.conn(),
            &Role {
                id: "r0".into(),
                name: "Admin".into(),
                description: None,
                permissions: vec!["*".into()],
                is_system: true,
                created_at: ts(),
                updated_at: ts(),
            },
        )
        .await
        .unwrap();
        let user = User {
            id: "u1".into(),
            username: "admin".into(),
            email: None,
            full_name: "Administrator".into(),
            role_id: "r0".into(),
            branch_id: None,
            is_active: true,
            created_at: ts(),
        };
        UserRepository::insert(tx.conn(), &user, "$argon2id$stub").await.unwrap();
        assert!(UserRepository::exists_by_username(tx.conn(), "ADMIN").await.unwrap());
        tx.commit().await.unwrap();

        let (found, hash) = db.users().find_by_username("Admin").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(hash, "$argon2id$stub");
        assert_eq!(db.users().get("u1").await.unwrap(), user);
        assert!(db.users().find_by_username("nobody").await.unwrap().is_none());
        assert_eq!(db.users().count().await.unwrap(), 1);
    }
}

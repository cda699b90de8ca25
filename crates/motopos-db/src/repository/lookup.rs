//! # Lookup Repositories
//!
//! Categories and brands share one shape (`id`, `name`, `description`,
//! `created_at`) and one set of rules, so a single generic repository serves
//! both tables.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use motopos_core::{Brand, Category};

/// A row type stored in one of the lookup tables.
pub trait LookupEntity: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Entity name used in errors.
    const ENTITY: &'static str;
    /// Column in `products` that references this table.
    const PRODUCT_COLUMN: &'static str;

    fn build(id: String, name: String, description: Option<String>, created_at: DateTime<Utc>) -> Self;
}

impl LookupEntity for Category {
    const TABLE: &'static str = "categories";
    const ENTITY: &'static str = "Category";
    const PRODUCT_COLUMN: &'static str = "category_id";

    fn build(id: String, name: String, description: Option<String>, created_at: DateTime<Utc>) -> Self {
        Category { id, name, description, created_at }
    }
}

impl LookupEntity for Brand {
    const TABLE: &'static str = "brands";
    const ENTITY: &'static str = "Brand";
    const PRODUCT_COLUMN: &'static str = "brand_id";

    fn build(id: String, name: String, description: Option<String>, created_at: DateTime<Utc>) -> Self {
        Brand { id, name, description, created_at }
    }
}

pub type CategoryRepository = LookupRepository<Category>;
pub type BrandRepository = LookupRepository<Brand>;

#[derive(Debug)]
pub struct LookupRepository<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for LookupRepository<T> {
    fn clone(&self) -> Self {
        LookupRepository {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: LookupEntity> LookupRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        LookupRepository {
            pool,
            _entity: PhantomData,
        }
    }

    /// All entries ordered by name.
    pub async fn list(&self) -> DbResult<Vec<T>> {
        let sql = format!(
            "SELECT id, name, description, created_at FROM {} ORDER BY name COLLATE NOCASE",
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get(&self, id: &str) -> DbResult<T> {
        let sql = format!(
            "SELECT id, name, description, created_at FROM {} WHERE id = ?",
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(T::ENTITY, id))
    }

    pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", T::TABLE);
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }

    /// Inserts a new entry.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name taken (case-insensitive)
    pub async fn create(
        conn: &mut SqliteConnection,
        id: String,
        name: String,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> DbResult<T> {
        debug!(table = T::TABLE, name = %name, "Creating lookup entry");

        let sql = format!(
            "INSERT INTO {} (id, name, description, created_at) VALUES (?, ?, ?, ?)",
            T::TABLE
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(&name)
            .bind(&description)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        Ok(T::build(id, name, description, now))
    }

    /// Products referencing the entry, tombstones included.
    pub async fn reference_count(conn: &mut SqliteConnection, id: &str) -> DbResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM products WHERE {} = ?",
            T::PRODUCT_COLUMN
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        debug!(table = T::TABLE, id = %id, "Deleting lookup entry");

        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(T::ENTITY, id));
        }

        Ok(())
    }
}

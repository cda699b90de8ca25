//! # Company Repository
//!
//! The singleton store profile (row `id = 1`).

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use motopos_core::Company;

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// The profile, or `None` before the first save.
    pub async fn get(&self) -> DbResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT name, address, phone, email, tax_number, updated_at FROM company WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    pub async fn upsert(conn: &mut SqliteConnection, company: &Company) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company (id, name, address, phone, email, tax_number, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                phone = excluded.phone,
                email = excluded.email,
                tax_number = excluded.tax_number,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&company.name)
        .bind(&company.address)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(&company.tax_number)
        .bind(company.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn exists(conn: &mut SqliteConnection) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM company WHERE id = 1)")
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::tests::ts;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.company().get().await.unwrap().is_none());

        let mut company = Company {
            name: "Moto Parts Jaya".to_string(),
            address: None,
            phone: None,
            email: None,
            tax_number: Some("01.234.567.8-901.000".to_string()),
            updated_at: ts(),
        };
        let mut tx = db.begin_write().await.unwrap();
        CompanyRepository::upsert(tx.conn(), &company).await.unwrap();
        company.name = "Moto Parts Jaya Abadi".to_string();
        CompanyRepository::upsert(tx.conn(), &company).await.unwrap();
        assert!(CompanyRepository::exists(tx.conn()).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(db.company().get().await.unwrap(), Some(company));
    }
}

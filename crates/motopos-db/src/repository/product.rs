//! # Product Repository
//!
//! Database operations for products and the entries they own.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                     one row per product (incl. tombstones)   │
//! │    price_levels, tags, ...    JSON TEXT columns                        │
//! │    version                    bumped by every mutation                 │
//! │                                                                         │
//! │  product_promotions           (product_id, position) → entry           │
//! │  product_volume_discounts     (product_id, position) → entry           │
//! │  product_stocks               (product_id, branch_id) → quantity       │
//! │                                                                         │
//! │  Loading N products = 1 product query + 3 child queries (chunked),     │
//! │  all on the caller's connection so they share one snapshot.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use motopos_core::{
    DiscountType, Money, Product, ProductFilter, PromotionalPricing, VolumeDiscount,
};

/// Ids per `IN (...)` list, well under SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, description, category_id, brand_id, \
     compatible_models, unit_of_measure, purchase_price_cents, price_levels, technical_specs, \
     storage_location, tags, labels, min_stock, is_active, created_at, updated_at, \
     activated_at, deleted_at, version";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    barcode: String,
    name: String,
    description: Option<String>,
    category_id: String,
    brand_id: String,
    compatible_models: String,
    unit_of_measure: String,
    purchase_price_cents: i64,
    price_levels: String,
    technical_specs: String,
    storage_location: Option<String>,
    tags: String,
    labels: String,
    min_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            compatible_models: from_json("compatible_models", &self.compatible_models)?,
            price_levels: from_json("price_levels", &self.price_levels)?,
            technical_specs: from_json("technical_specs", &self.technical_specs)?,
            tags: from_json("tags", &self.tags)?,
            labels: from_json("labels", &self.labels)?,
            id: self.id,
            sku: self.sku,
            barcode: self.barcode,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            brand_id: self.brand_id,
            unit_of_measure: self.unit_of_measure,
            purchase_price: Money::from_cents(self.purchase_price_cents),
            storage_location: self.storage_location,
            min_stock: self.min_stock,
            is_active: self.is_active,
            promotional_pricing: Vec::new(),
            volume_discounts: Vec::new(),
            stock: BTreeMap::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            activated_at: self.activated_at,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    product_id: String,
    position: i64,
    name: String,
    price_levels: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VolumeDiscountRow {
    product_id: String,
    position: i64,
    min_quantity: i64,
    discount_type: DiscountType,
    discount_value: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    product_id: String,
    branch_id: String,
    quantity: i64,
}

/// Which product identity column to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Sku,
    Barcode,
}

impl IdentityField {
    pub fn column(&self) -> &'static str {
        match self {
            IdentityField::Sku => "sku",
            IdentityField::Barcode => "barcode",
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// // Reads run on a snapshot
/// let mut tx = db.begin_read().await?;
/// let product = ProductRepository::load_live(&mut tx, "uuid-here").await?;
/// let brakes = ProductRepository::load_many(
///     &mut tx,
///     &ProductFilter { category_id: Some(cat), ..Default::default() },
///     false,
/// ).await?;
///
/// // Mutations run on the caller's write transaction
/// let mut tx = db.begin_write().await?;
/// ProductRepository::insert(tx.conn(), &product).await?;
/// tx.commit().await?;
///
/// // Standalone count for diagnostics and seeding
/// let live = db.products().count().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Counts live products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Connection-level reads
    // -------------------------------------------------------------------------

    /// Loads a product by id, tombstoned or not.
    pub async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Self::attach_children(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Loads a product that must exist and must not be tombstoned.
    pub async fn load_live(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
        match Self::load(conn, id).await? {
            Some(product) if !product.is_deleted() => Ok(product),
            _ => Err(DbError::not_found("Product", id)),
        }
    }

    /// Loads all products matching `filter`.
    ///
    /// Category, brand and active filters run in SQL. The name search runs
    /// here with Unicode-aware lowercasing, which SQLite's `LIKE` lacks.
    pub async fn load_many(
        conn: &mut SqliteConnection,
        filter: &ProductFilter,
        include_deleted: bool,
    ) -> DbResult<Vec<Product>> {
        debug!(?filter, include_deleted, "Listing products");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));
        if !include_deleted {
            qb.push(" AND deleted_at IS NULL");
        }
        if let Some(category_id) = &filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id.clone());
        }
        if let Some(brand_id) = &filter.brand_id {
            qb.push(" AND brand_id = ").push_bind(brand_id.clone());
        }
        if let Some(is_active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        qb.push(" ORDER BY name COLLATE NOCASE, id");

        let mut rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        if let Some(search) = filter.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                rows.retain(|row| row.name.to_lowercase().contains(&needle));
            }
        }

        let products = Self::attach_children(conn, rows).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    async fn attach_children(
        conn: &mut SqliteConnection,
        rows: Vec<ProductRow>,
    ) -> DbResult<Vec<Product>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let mut promotions: HashMap<String, Vec<PromotionalPricing>> = HashMap::new();
        let mut tiers: HashMap<String, Vec<VolumeDiscount>> = HashMap::new();
        let mut stock: HashMap<String, BTreeMap<String, i64>> = HashMap::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT product_id, position, name, price_levels, start_date, end_date, \
                 is_active, created_at FROM product_promotions WHERE product_id IN (",
            );
            push_ids(&mut qb, chunk);
            qb.push(" ORDER BY product_id, position");
            let rows: Vec<PromotionRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
            for row in rows {
                promotions
                    .entry(row.product_id)
                    .or_default()
                    .push(PromotionalPricing {
                        position: row.position,
                        name: row.name,
                        price_levels: from_json("promotion.price_levels", &row.price_levels)?,
                        start_date: row.start_date,
                        end_date: row.end_date,
                        is_active: row.is_active,
                        created_at: row.created_at,
                    });
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT product_id, position, min_quantity, discount_type, discount_value, \
                 is_active, created_at FROM product_volume_discounts WHERE product_id IN (",
            );
            push_ids(&mut qb, chunk);
            qb.push(" ORDER BY product_id, position");
            let rows: Vec<VolumeDiscountRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
            for row in rows {
                tiers.entry(row.product_id).or_default().push(VolumeDiscount {
                    position: row.position,
                    min_quantity: row.min_quantity,
                    discount_type: row.discount_type,
                    discount_value: row.discount_value,
                    is_active: row.is_active,
                    created_at: row.created_at,
                });
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT product_id, branch_id, quantity FROM product_stocks WHERE product_id IN (",
            );
            push_ids(&mut qb, chunk);
            let rows: Vec<StockRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
            for row in rows {
                stock
                    .entry(row.product_id)
                    .or_default()
                    .insert(row.branch_id, row.quantity);
            }
        }

        rows.into_iter()
            .map(|row| {
                let mut product = row.into_product()?;
                product.promotional_pricing = promotions.remove(&product.id).unwrap_or_default();
                product.volume_discounts = tiers.remove(&product.id).unwrap_or_default();
                product.stock = stock.remove(&product.id).unwrap_or_default();
                Ok(product)
            })
            .collect()
    }

    /// Whether an identity value is already assigned (tombstones included).
    pub async fn identity_taken(
        conn: &mut SqliteConnection,
        field: IdentityField,
        value: &str,
    ) -> DbResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM products WHERE {} = ?)",
            field.column()
        );
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&mut *conn)
            .await?;
        Ok(taken)
    }

    // -------------------------------------------------------------------------
    // Connection-level writes
    // -------------------------------------------------------------------------

    /// Inserts a new product row. Children are appended separately.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, barcode = %product.barcode, "Inserting product");

        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&product.id)
            .bind(&product.sku)
            .bind(&product.barcode)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.category_id)
            .bind(&product.brand_id)
            .bind(to_json("compatible_models", &product.compatible_models)?)
            .bind(&product.unit_of_measure)
            .bind(product.purchase_price.cents())
            .bind(to_json("price_levels", &product.price_levels)?)
            .bind(to_json("technical_specs", &product.technical_specs)?)
            .bind(&product.storage_location)
            .bind(to_json("tags", &product.tags)?)
            .bind(to_json("labels", &product.labels)?)
            .bind(product.min_stock)
            .bind(product.is_active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .bind(product.activated_at)
            .bind(product.deleted_at)
            .bind(product.version)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Writes every mutable column of `product` and bumps `version`.
    ///
    /// `id`, `sku`, `barcode` and `created_at` are never written.
    pub async fn save(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Saving product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?,
                description = ?,
                category_id = ?,
                brand_id = ?,
                compatible_models = ?,
                unit_of_measure = ?,
                purchase_price_cents = ?,
                price_levels = ?,
                technical_specs = ?,
                storage_location = ?,
                tags = ?,
                labels = ?,
                min_stock = ?,
                is_active = ?,
                updated_at = ?,
                activated_at = ?,
                deleted_at = ?,
                version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(&product.brand_id)
        .bind(to_json("compatible_models", &product.compatible_models)?)
        .bind(&product.unit_of_measure)
        .bind(product.purchase_price.cents())
        .bind(to_json("price_levels", &product.price_levels)?)
        .bind(to_json("technical_specs", &product.technical_specs)?)
        .bind(&product.storage_location)
        .bind(to_json("tags", &product.tags)?)
        .bind(to_json("labels", &product.labels)?)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(product.activated_at)
        .bind(product.deleted_at)
        .bind(&product.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Bumps `version` and `updated_at` after a child mutation.
    pub async fn touch(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET updated_at = ?, version = version + 1 \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Appends a promotion at its assigned position.
    pub async fn insert_promotion(
        conn: &mut SqliteConnection,
        product_id: &str,
        promotion: &PromotionalPricing,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, position = promotion.position, "Appending promotion");

        sqlx::query(
            "INSERT INTO product_promotions \
             (product_id, position, name, price_levels, start_date, end_date, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(promotion.position)
        .bind(&promotion.name)
        .bind(to_json("promotion.price_levels", &promotion.price_levels)?)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.is_active)
        .bind(promotion.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Appends a volume discount tier at its assigned position.
    pub async fn insert_volume_discount(
        conn: &mut SqliteConnection,
        product_id: &str,
        tier: &VolumeDiscount,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, position = tier.position, "Appending volume discount");

        sqlx::query(
            "INSERT INTO product_volume_discounts \
             (product_id, position, min_quantity, discount_type, discount_value, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(tier.position)
        .bind(tier.min_quantity)
        .bind(tier.discount_type)
        .bind(tier.discount_value)
        .bind(tier.is_active)
        .bind(tier.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

fn push_ids(qb: &mut QueryBuilder<Sqlite>, ids: &[String]) {
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}

// =============================================================================
// Unit Tests
// =============================================================================

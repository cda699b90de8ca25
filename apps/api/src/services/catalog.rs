//! # Product Catalog Service
//!
//! Owns the product lifecycle and composes identity generation, pricing,
//! the stock ledger and the margin report.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create            identity lock ─► write tx ─► commit                  │
//! │  update / toggle   ┐                                                    │
//! │  delete            │                                                    │
//! │  promo / tier      ├─ product lock ─► write tx ─► load ─► mutate ─►     │
//! │  stock writes      ┘                  save + version bump ─► commit     │
//! │                                                                         │
//! │  get / list / price / report ─► read tx (one snapshot), retried once   │
//! │                                 on timeout                              │
//! │                                                                         │
//! │  Every storage call runs under Database::bounded; on expiry the write  │
//! │  transaction is dropped and rolls back.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock writes (set, adjust, transfer) share one path: every changed count
//! is written together with its movement row, and a write whose stock value
//! would leave the i64 range is refused before anything is stored.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqliteConnection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::locks::LockRegistry;
use motopos_core::pricing;
use motopos_core::stock::{self, normalize_reason};
use motopos_core::validation::{
    validate_product_input, validate_search_query, validate_stock_quantity,
};
use motopos_core::{
    AdjustDirection, CoreError, IdentityGenerator, MarginReport, Money, MovementKind, NewPromotion,
    NewStockMovement, NewVolumeDiscount, PriceQuote, Product, ProductFilter, ProductInput,
    StockMovement, ValidationError, RETAIL_LEVEL,
};
use motopos_db::{
    generate_id, BranchRepository, BrandRepository, CategoryRepository, Database, IdentityField,
    ProductRepository, StockRepository,
};

/// Largest page of movement history returned at once.
pub const MAX_MOVEMENTS_PAGE: i64 = 500;

/// A product after a stock write, with the movements it recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct StockUpdate {
    pub product: Product,
    pub movements: Vec<StockMovement>,
}

/// One planned branch count.
struct StockWrite {
    branch_id: String,
    kind: MovementKind,
    quantity: i64,
    counterpart: Option<String>,
}

impl StockWrite {
    fn new(branch_id: &str, kind: MovementKind, quantity: i64, counterpart: Option<&str>) -> Self {
        StockWrite {
            branch_id: branch_id.to_string(),
            kind,
            quantity,
            counterpart: counterpart.map(str::to_string),
        }
    }
}

/// Stock held by one product at one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReading {
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub total_stock: i64,
}

/// The product catalog.
pub struct ProductCatalog {
    db: Database,
    locks: LockRegistry,
    identities: Mutex<IdentityGenerator<StdRng>>,
}

impl ProductCatalog {
    pub fn new(db: Database) -> Self {
        ProductCatalog {
            db,
            locks: LockRegistry::new(),
            identities: Mutex::new(IdentityGenerator::new(StdRng::from_os_rng())),
        }
    }

    /// Runs an idempotent read, retrying once if it times out.
    async fn read<T, F, Fut>(&self, op: F) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        match self.db.bounded(op()).await {
            Err(err) if err.is_timeout() => {
                warn!("Read timed out, retrying once");
                self.db.bounded(op()).await
            }
            result => result,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates a product, generating SKU and barcode when they are omitted.
    pub async fn create(&self, input: ProductInput) -> ApiResult<Product> {
        validate_product_input(&input)?;

        let mut generator = self.identities.lock().await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                ensure_references(tx.conn(), &input).await?;

                let sku = claim_identity(tx.conn(), IdentityField::Sku, input.sku.as_deref(), |taken| {
                    generator.generate_sku(now, taken)
                })
                .await?;
                let barcode = claim_identity(
                    tx.conn(),
                    IdentityField::Barcode,
                    input.barcode.as_deref(),
                    |taken| generator.generate_barcode(now, taken),
                )
                .await?;

                let is_active = input.is_active.unwrap_or(true);
                let mut product = Product {
                    id: generate_id(),
                    sku,
                    barcode,
                    name: String::new(),
                    description: None,
                    category_id: String::new(),
                    brand_id: String::new(),
                    compatible_models: Vec::new(),
                    unit_of_measure: String::new(),
                    purchase_price: Money::zero(),
                    price_levels: Default::default(),
                    technical_specs: Default::default(),
                    storage_location: None,
                    tags: Default::default(),
                    labels: Default::default(),
                    min_stock: 0,
                    is_active,
                    promotional_pricing: Vec::new(),
                    volume_discounts: Vec::new(),
                    stock: Default::default(),
                    created_at: now,
                    updated_at: now,
                    activated_at: is_active.then_some(now),
                    deleted_at: None,
                    version: 1,
                };
                apply_input(&mut product, &input);

                ProductRepository::insert(tx.conn(), &product).await?;
                tx.commit().await?;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, sku = %product.sku, barcode = %product.barcode, "Product created");
        Ok(product)
    }

    /// Full-field replace. Identity, promotions, tiers and stock are untouched.
    pub async fn update(&self, id: &str, input: ProductInput) -> ApiResult<Product> {
        validate_product_input(&input)?;

        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;

                if input.sku.as_ref().is_some_and(|sku| *sku != product.sku) {
                    return Err(ApiError::from(ValidationError::Immutable { field: "sku".into() }));
                }
                if input.barcode.as_ref().is_some_and(|b| *b != product.barcode) {
                    return Err(ApiError::from(ValidationError::Immutable {
                        field: "barcode".into(),
                    }));
                }
                ensure_references(tx.conn(), &input).await?;

                apply_input(&mut product, &input);
                if let Some(is_active) = input.is_active {
                    set_active(&mut product, is_active, now)?;
                }
                // A new purchase price revalues the stock already on hand.
                product.stock_value()?;
                product.updated_at = now;

                ProductRepository::save(tx.conn(), &product).await?;
                tx.commit().await?;
                product.version += 1;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, version = product.version, "Product updated");
        Ok(product)
    }

    /// Flips `is_active`. Activation requires a retail price.
    pub async fn toggle(&self, id: &str) -> ApiResult<Product> {
        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;

                let activate = !product.is_active;
                set_active(&mut product, activate, now)?;
                product.updated_at = now;

                ProductRepository::save(tx.conn(), &product).await?;
                tx.commit().await?;
                product.version += 1;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, is_active = product.is_active, "Product toggled");
        Ok(product)
    }

    /// Tombstones a product. Its SKU and barcode stay reserved.
    pub async fn delete(&self, id: &str) -> ApiResult<Product> {
        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;

                product.deleted_at = Some(now);
                product.updated_at = now;

                ProductRepository::save(tx.conn(), &product).await?;
                tx.commit().await?;
                product.version += 1;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, sku = %product.sku, "Product deleted");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Product> {
        let db = &self.db;
        self.read(move || async move {
            let mut tx = db.begin_read().await?;
            Ok(ProductRepository::load_live(&mut tx, id).await?)
        })
        .await
    }

    /// Lists live products. Filters combine; `search` is a case-insensitive
    /// name substring.
    pub async fn list(&self, mut filter: ProductFilter) -> ApiResult<Vec<Product>> {
        if let Some(search) = filter.search.take() {
            let search = validate_search_query(&search)?;
            filter.search = (!search.is_empty()).then_some(search);
        }

        let db = &self.db;
        let filter = &filter;
        self.read(move || async move {
            let mut tx = db.begin_read().await?;
            Ok(ProductRepository::load_many(&mut tx, filter, false).await?)
        })
        .await
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    pub async fn add_promotion(&self, id: &str, input: NewPromotion) -> ApiResult<Product> {
        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;

                let entry = pricing::add_promotion(&mut product, input, now)?;
                ProductRepository::insert_promotion(tx.conn(), id, &entry).await?;
                ProductRepository::touch(tx.conn(), id, now).await?;
                tx.commit().await?;

                debug!(id = %id, position = entry.position, "Promotion appended");
                product.updated_at = now;
                product.version += 1;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, promotions = product.promotional_pricing.len(), "Promotion added");
        Ok(product)
    }

    pub async fn add_volume_discount(&self, id: &str, input: NewVolumeDiscount) -> ApiResult<Product> {
        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        let product = self
            .db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;

                let entry = pricing::add_volume_discount(&mut product, input, now)?;
                ProductRepository::insert_volume_discount(tx.conn(), id, &entry).await?;
                ProductRepository::touch(tx.conn(), id, now).await?;
                tx.commit().await?;

                debug!(id = %id, position = entry.position, "Volume discount appended");
                product.updated_at = now;
                product.version += 1;
                Ok::<_, ApiError>(product)
            })
            .await?;

        info!(id = %product.id, tiers = product.volume_discounts.len(), "Volume discount added");
        Ok(product)
    }

    pub async fn effective_price(
        &self,
        id: &str,
        level: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<Money> {
        let product = self.get(id).await?;
        Ok(pricing::effective_price(&product, level, quantity, at)?)
    }

    pub async fn quote(
        &self,
        id: &str,
        level: &str,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<PriceQuote> {
        let product = self.get(id).await?;
        Ok(pricing::quote(&product, level, quantity, at)?)
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    /// Overwrites the quantity a branch holds and returns the updated product.
    ///
    /// Records a `set` movement carrying the previous count.
    pub async fn set_stock(
        &self,
        id: &str,
        branch_id: &str,
        quantity: i64,
        reason: Option<&str>,
    ) -> ApiResult<Product> {
        validate_stock_quantity(quantity)?;
        let reason = normalize_reason(reason)?;

        let update = self
            .write_stock(id, &[branch_id], reason, |_| {
                Ok(vec![StockWrite::new(branch_id, MovementKind::Set, quantity, None)])
            })
            .await?;

        info!(
            id = %update.product.id,
            branch_id = %branch_id,
            quantity,
            total = update.product.total_stock(),
            "Stock set"
        );
        Ok(update.product)
    }

    /// Moves `quantity` units IN or OUT of one branch.
    ///
    /// An OUT larger than the branch holds fails with `InsufficientStock`.
    pub async fn adjust_stock(
        &self,
        id: &str,
        branch_id: &str,
        direction: AdjustDirection,
        quantity: i64,
        reason: Option<&str>,
    ) -> ApiResult<StockUpdate> {
        let reason = normalize_reason(reason)?;

        let update = self
            .write_stock(id, &[branch_id], reason, |product| {
                let after =
                    stock::apply_adjustment(branch_id, product.stock_at(branch_id), direction, quantity)?;
                Ok(vec![StockWrite::new(branch_id, MovementKind::Adjustment, after, None)])
            })
            .await?;

        info!(
            id = %id,
            branch_id = %branch_id,
            ?direction,
            quantity,
            after = update.product.stock_at(branch_id),
            "Stock adjusted"
        );
        Ok(update)
    }

    /// Moves units between two branches in one transaction.
    pub async fn transfer_stock(
        &self,
        id: &str,
        from_branch_id: &str,
        to_branch_id: &str,
        quantity: i64,
        reason: Option<&str>,
    ) -> ApiResult<StockUpdate> {
        let reason = normalize_reason(reason)?;

        let update = self
            .write_stock(id, &[from_branch_id, to_branch_id], reason, |product| {
                let (from_after, to_after) = stock::plan_transfer(
                    from_branch_id,
                    product.stock_at(from_branch_id),
                    to_branch_id,
                    product.stock_at(to_branch_id),
                    quantity,
                )?;
                Ok(vec![
                    StockWrite::new(from_branch_id, MovementKind::TransferOut, from_after, Some(to_branch_id)),
                    StockWrite::new(to_branch_id, MovementKind::TransferIn, to_after, Some(from_branch_id)),
                ])
            })
            .await?;

        info!(
            id = %id,
            from = %from_branch_id,
            to = %to_branch_id,
            quantity,
            "Stock transferred"
        );
        Ok(update)
    }

    /// Movement history of a live product, newest first.
    pub async fn stock_movements(
        &self,
        id: &str,
        branch_id: Option<&str>,
        limit: i64,
    ) -> ApiResult<Vec<StockMovement>> {
        let limit = limit.clamp(1, MAX_MOVEMENTS_PAGE);
        let db = &self.db;
        self.read(move || async move {
            let mut tx = db.begin_read().await?;
            ProductRepository::load_live(&mut tx, id).await?;
            Ok(StockRepository::movements(&mut tx, id, branch_id, limit).await?)
        })
        .await
    }

    /// Shared write path of the stock ledger.
    ///
    /// Under the product lock and one write transaction: loads the product,
    /// checks every branch exists, asks `plan` for the new counts, verifies
    /// the product can still be valued, then writes each count with its
    /// movement row.
    async fn write_stock<F>(
        &self,
        id: &str,
        branch_ids: &[&str],
        reason: Option<String>,
        plan: F,
    ) -> ApiResult<StockUpdate>
    where
        F: FnOnce(&Product) -> ApiResult<Vec<StockWrite>>,
    {
        let _guard = self.locks.acquire(id).await;
        let now = Utc::now();

        self.db
            .bounded(async {
                let mut tx = self.db.begin_write().await?;
                let mut product = ProductRepository::load_live(tx.conn(), id).await?;
                for branch_id in branch_ids {
                    if !BranchRepository::exists(tx.conn(), branch_id).await? {
                        return Err(ApiError::not_found("Branch", *branch_id));
                    }
                }

                let writes = plan(&product)?;
                let mut pending = Vec::with_capacity(writes.len());
                for write in writes {
                    let before = product.stock_at(&write.branch_id);
                    product.stock.insert(write.branch_id.clone(), write.quantity);
                    pending.push(NewStockMovement {
                        product_id: product.id.clone(),
                        branch_id: write.branch_id,
                        kind: write.kind,
                        quantity_before: before,
                        quantity_after: write.quantity,
                        counterpart_branch_id: write.counterpart,
                        reason: reason.clone(),
                    });
                }
                product.stock_value()?;

                let mut movements = Vec::with_capacity(pending.len());
                for movement in &pending {
                    StockRepository::set(
                        tx.conn(),
                        id,
                        &movement.branch_id,
                        movement.quantity_after,
                        now,
                    )
                    .await?;
                    movements.push(StockRepository::record(tx.conn(), movement, now).await?);
                }
                ProductRepository::touch(tx.conn(), id, now).await?;
                tx.commit().await?;

                product.updated_at = now;
                product.version += 1;
                Ok::<_, ApiError>(StockUpdate { product, movements })
            })
            .await
    }

    /// Quantity at one branch plus the product's total, from one snapshot.
    pub async fn get_stock(&self, id: &str, branch_id: &str) -> ApiResult<StockReading> {
        let db = &self.db;
        self.read(move || async move {
            let mut tx = db.begin_read().await?;
            ProductRepository::load_live(&mut tx, id).await?;
            if !BranchRepository::exists(&mut tx, branch_id).await? {
                return Err(ApiError::not_found("Branch", branch_id));
            }
            Ok(StockReading {
                product_id: id.to_string(),
                branch_id: branch_id.to_string(),
                quantity: StockRepository::quantity(&mut tx, id, branch_id).await?,
                total_stock: StockRepository::total_in(&mut tx, id).await?,
            })
        })
        .await
    }

    pub async fn total_stock(&self, id: &str) -> ApiResult<i64> {
        Ok(self.get(id).await?.total_stock())
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Margin and valuation report over one read snapshot.
    pub async fn margin_report(&self, include_deleted: bool) -> ApiResult<MarginReport> {
        let db = &self.db;
        let report = self
            .read(move || async move {
                let mut tx = db.begin_read().await?;
                let products =
                    ProductRepository::load_many(&mut tx, &ProductFilter::default(), include_deleted)
                        .await?;
                let branches = BranchRepository::list_in(&mut tx).await?;
                Ok(motopos_core::build_margin_report(
                    &products,
                    &branches,
                    include_deleted,
                    Utc::now(),
                )?)
            })
            .await?;

        debug!(
            products = report.summary.total_products,
            stock_value = %report.summary.total_stock_value,
            "Margin report built"
        );
        Ok(report)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn ensure_references(conn: &mut SqliteConnection, input: &ProductInput) -> ApiResult<()> {
    if !CategoryRepository::exists(conn, &input.category_id).await? {
        return Err(ValidationError::UnknownReference {
            field: "category_id".into(),
            entity: "category".into(),
            id: input.category_id.clone(),
        }
        .into());
    }
    if !BrandRepository::exists(conn, &input.brand_id).await? {
        return Err(ValidationError::UnknownReference {
            field: "brand_id".into(),
            entity: "brand".into(),
            id: input.brand_id.clone(),
        }
        .into());
    }
    Ok(())
}

/// Returns the supplied identity if it is free, or the first generated
/// candidate storage does not already hold.
///
/// Each candidate is checked on the caller's write transaction, so the
/// catalog never loads the full identity set. Candidates found taken are
/// handed back to `generate`, which never repeats them.
async fn claim_identity<G>(
    conn: &mut SqliteConnection,
    field: IdentityField,
    supplied: Option<&str>,
    mut generate: G,
) -> ApiResult<String>
where
    G: FnMut(&HashSet<String>) -> String,
{
    if let Some(value) = supplied {
        if ProductRepository::identity_taken(conn, field, value).await? {
            return Err(CoreError::duplicate_identity(field.column(), value).into());
        }
        return Ok(value.to_string());
    }

    let mut rejected = HashSet::new();
    loop {
        let candidate = generate(&rejected);
        if !ProductRepository::identity_taken(conn, field, &candidate).await? {
            return Ok(candidate);
        }
        debug!(field = field.column(), candidate = %candidate, "Generated identity taken, retrying");
        rejected.insert(candidate);
    }
}

/// Copies the editable fields of `input` onto `product`.
fn apply_input(product: &mut Product, input: &ProductInput) {
    product.name = input.name.trim().to_string();
    product.description = input.description.clone();
    product.category_id = input.category_id.clone();
    product.brand_id = input.brand_id.clone();
    product.compatible_models = input.compatible_models.clone();
    product.unit_of_measure = match input.unit_of_measure.trim() {
        "" => "PCS".to_string(),
        unit => unit.to_string(),
    };
    product.purchase_price = input.purchase_price;
    product.price_levels = input.price_levels.clone();
    product.technical_specs = input.technical_specs.clone();
    product.storage_location = input.storage_location.clone();
    product.tags = input.tags.clone();
    product.labels = input.labels.clone();
    product.min_stock = input.min_stock;
}

fn set_active(product: &mut Product, active: bool, now: DateTime<Utc>) -> ApiResult<()> {
    if active && product.price_level(RETAIL_LEVEL).is_none() {
        return Err(ValidationError::Required {
            field: "price_levels.retail".into(),
        }
        .into());
    }
    if active && product.activated_at.is_none() {
        product.activated_at = Some(now);
    }
    product.is_active = active;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use motopos_core::{Branch, DiscountType, PriceLevels, ProductStatus};
    use motopos_db::DbConfig;
    use std::sync::Arc;

    pub(crate) async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut tx = db.begin_write().await.unwrap();
        CategoryRepository::create(tx.conn(), "cat-1".into(), "Brakes".into(), None, now)
            .await
            .unwrap();
        BrandRepository::create(tx.conn(), "brand-1".into(), "Nissin".into(), None, now)
            .await
            .unwrap();
        for (id, code) in [("branch-1", "JKT-01"), ("branch-2", "BDG-01")] {
            let branch = Branch {
                id: id.to_string(),
                code: code.to_string(),
                name: format!("Store {}", code),
                address: None,
                phone: None,
                email: None,
                manager_name: None,
                manager_phone: None,
                operating_hours: None,
                stock_capacity: 100,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            BranchRepository::insert(tx.conn(), &branch).await.unwrap();
        }
        tx.commit().await.unwrap();
        db
    }

    pub(crate) fn input(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category_id: "cat-1".to_string(),
            brand_id: "brand-1".to_string(),
            unit_of_measure: "SET".to_string(),
            purchase_price: Money::from_cents(6000),
            price_levels: PriceLevels::from([("retail".to_string(), Money::from_cents(10000))]),
            ..Default::default()
        }
    }

    async fn catalog() -> ProductCatalog {
        ProductCatalog::new(seeded_db().await)
    }

    #[tokio::test]
    async fn test_create_generates_identity() {
        let catalog = catalog().await;
        let product = catalog.create(input("  Brake Pad Front ")).await.unwrap();

        assert!(product.sku.starts_with("PRD-"));
        assert!(product.barcode.len() >= 10);
        assert_eq!(product.name, "Brake Pad Front");
        assert_eq!(product.status(), ProductStatus::Active);
        assert_eq!(product.version, 1);

        let other = catalog.create(input("Brake Pad Rear")).await.unwrap();
        assert_ne!(product.sku, other.sku);
        assert_ne!(product.barcode, other.barcode);
    }

    #[tokio::test]
    async fn test_create_rejects_taken_sku_and_unknown_reference() {
        let catalog = catalog().await;
        let mut first = input("Clutch Plate");
        first.sku = Some("PRD-CLUTCH-01".to_string());
        catalog.create(first.clone()).await.unwrap();

        first.name = "Clutch Plate 2".to_string();
        let err = catalog.create(first).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DuplicateIdentity);

        let mut orphan = input("Chain");
        orphan.brand_id = "brand-x".to_string();
        let err = catalog.create(orphan).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        assert!(err.message.contains("brand_id"));
    }

    #[tokio::test]
    async fn test_draft_then_toggle_activates() {
        let catalog = catalog().await;
        let mut draft = input("Spark Plug");
        draft.is_active = Some(false);
        let product = catalog.create(draft).await.unwrap();
        assert_eq!(product.status(), ProductStatus::Draft);

        let product = catalog.toggle(&product.id).await.unwrap();
        assert_eq!(product.status(), ProductStatus::Active);
        assert!(product.activated_at.is_some());
        assert_eq!(product.version, 2);

        let product = catalog.toggle(&product.id).await.unwrap();
        assert_eq!(product.status(), ProductStatus::Inactive);

        let stored = catalog.get(&product.id).await.unwrap();
        assert_eq!(stored.version, 3);
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_update_keeps_identity_immutable() {
        let catalog = catalog().await;
        let product = catalog.create(input("Oil Filter")).await.unwrap();

        let mut change = input("Oil Filter HF204");
        change.sku = Some(product.sku.clone());
        let updated = catalog.update(&product.id, change.clone()).await.unwrap();
        assert_eq!(updated.name, "Oil Filter HF204");
        assert_eq!(updated.barcode, product.barcode);
        assert_eq!(updated.version, 2);

        change.sku = Some("PRD-OTHER-01".to_string());
        let err = catalog.update(&product.id, change).await.unwrap_err();
        assert!(err.message.contains("immutable"));
    }

    #[tokio::test]
    async fn test_deleted_product_is_gone_but_identity_reserved() {
        let catalog = catalog().await;
        let mut first = input("Air Filter");
        first.sku = Some("PRD-AIR-01".to_string());
        let product = catalog.create(first.clone()).await.unwrap();

        catalog.delete(&product.id).await.unwrap();
        assert_eq!(
            catalog.get(&product.id).await.unwrap_err().code,
            crate::error::ErrorCode::NotFound
        );
        assert!(catalog.list(ProductFilter::default()).await.unwrap().is_empty());

        let err = catalog.create(first).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DuplicateIdentity);
    }

    #[tokio::test]
    async fn test_tier_and_promotion_pricing() {
        let catalog = catalog().await;
        let product = catalog.create(input("Brake Disc")).await.unwrap();
        let now = Utc::now();

        catalog
            .add_volume_discount(
                &product.id,
                NewVolumeDiscount {
                    min_quantity: 10,
                    discount_type: DiscountType::Percentage,
                    discount_value: 1500,
                    is_active: true,
                },
            )
            .await
            .unwrap();

        let price = catalog.effective_price(&product.id, "retail", 10, now).await.unwrap();
        assert_eq!(price.cents(), 8500);
        let price = catalog.effective_price(&product.id, "retail", 9, now).await.unwrap();
        assert_eq!(price.cents(), 10000);

        catalog
            .add_promotion(
                &product.id,
                NewPromotion {
                    name: "Flash Sale".to_string(),
                    price_levels: PriceLevels::from([(
                        "retail".to_string(),
                        Money::from_cents(2999),
                    )]),
                    start_date: now - Duration::hours(1),
                    end_date: now + Duration::hours(1),
                    is_active: true,
                },
            )
            .await
            .unwrap();

        let quote = catalog.quote(&product.id, "retail", 1, now).await.unwrap();
        assert_eq!(quote.unit_price.cents(), 2999);
        assert_eq!(quote.list_price, Some(Money::from_cents(10000)));
        assert_eq!(quote.promotion.map(|p| p.name), Some("Flash Sale".to_string()));

        let err = catalog
            .effective_price(&product.id, "vip", 1, now)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnknownPriceLevel);

        let stored = catalog.get(&product.id).await.unwrap();
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn test_concurrent_promotions_are_all_kept() {
        let catalog = Arc::new(catalog().await);
        let product = catalog.create(input("Chain Kit")).await.unwrap();
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let catalog = catalog.clone();
            let id = product.id.clone();
            handles.push(tokio::spawn(async move {
                catalog
                    .add_promotion(
                        &id,
                        NewPromotion {
                            name: format!("Promo {}", i),
                            price_levels: PriceLevels::from([(
                                "retail".to_string(),
                                Money::from_cents(9000 - i),
                            )]),
                            start_date: start,
                            end_date: start + Duration::days(7),
                            is_active: true,
                        },
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = catalog.get(&product.id).await.unwrap();
        let positions: Vec<i64> = stored.promotional_pricing.iter().map(|p| p.position).collect();
        assert_eq!(positions, (0..8).collect::<Vec<_>>());
        assert_eq!(stored.version, 9);
    }

    #[tokio::test]
    async fn test_stock_ledger() {
        let catalog = catalog().await;
        let product = catalog.create(input("Fork Seal")).await.unwrap();

        let updated = catalog.set_stock(&product.id, "branch-1", 50, None).await.unwrap();
        assert_eq!(updated.stock_at("branch-1"), 50);
        catalog.set_stock(&product.id, "branch-2", 7, None).await.unwrap();
        catalog.set_stock(&product.id, "branch-1", 0, None).await.unwrap();

        let reading = catalog.get_stock(&product.id, "branch-1").await.unwrap();
        assert_eq!(reading.quantity, 0);
        assert_eq!(reading.total_stock, 7);
        assert_eq!(catalog.total_stock(&product.id).await.unwrap(), 7);

        let err = catalog.set_stock(&product.id, "branch-1", -1, None).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let err = catalog.set_stock(&product.id, "branch-x", 1, None).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_oversized_stock_is_rejected_and_report_survives() {
        let catalog = catalog().await;
        let product = catalog.create(input("Brake Cable")).await.unwrap();

        let err = catalog
            .set_stock(&product.id, "branch-1", 100_000_000_000_000_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let report = catalog.margin_report(false).await.unwrap();
        assert_eq!(report.summary.total_stock_units, 0);
    }

    #[tokio::test]
    async fn test_stock_write_that_overflows_value_is_refused() {
        let catalog = catalog().await;
        let mut pricey = input("Engine Block");
        pricey.purchase_price = Money::from_cents(motopos_core::MAX_AMOUNT_CENTS);
        pricey.price_levels =
            PriceLevels::from([("retail".to_string(), Money::from_cents(motopos_core::MAX_AMOUNT_CENTS))]);
        let product = catalog.create(pricey).await.unwrap();

        let err = catalog
            .set_stock(&product.id, "branch-1", motopos_core::MAX_STOCK_QUANTITY, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValueOverflow);
        assert_eq!(catalog.get(&product.id).await.unwrap().total_stock(), 0);
        assert!(catalog.stock_movements(&product.id, None, 10).await.unwrap().is_empty());

        // Revaluing existing stock is checked the same way.
        let cheap = catalog.create(input("Washer")).await.unwrap();
        catalog.set_stock(&cheap.id, "branch-1", 1_000_000, None).await.unwrap();
        let mut change = input("Washer");
        change.purchase_price = Money::from_cents(motopos_core::MAX_AMOUNT_CENTS);
        change.price_levels =
            PriceLevels::from([("retail".to_string(), Money::from_cents(motopos_core::MAX_AMOUNT_CENTS))]);
        let err = catalog.update(&cheap.id, change).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValueOverflow);
        assert_eq!(catalog.get(&cheap.id).await.unwrap().purchase_price.cents(), 6000);

        assert!(catalog.margin_report(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_adjust_and_transfer_record_movements() {
        let catalog = catalog().await;
        let product = catalog.create(input("Drive Belt")).await.unwrap();
        catalog
            .set_stock(&product.id, "branch-1", 10, Some("opening count"))
            .await
            .unwrap();

        let update = catalog
            .adjust_stock(&product.id, "branch-1", AdjustDirection::In, 5, Some("delivery"))
            .await
            .unwrap();
        assert_eq!(update.product.stock_at("branch-1"), 15);
        assert_eq!(update.movements.len(), 1);
        assert_eq!(update.movements[0].delta(), 5);

        let err = catalog
            .adjust_stock(&product.id, "branch-1", AdjustDirection::Out, 16, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InsufficientStock);

        let update = catalog
            .transfer_stock(&product.id, "branch-1", "branch-2", 6, Some("rebalance"))
            .await
            .unwrap();
        assert_eq!(update.product.stock_at("branch-1"), 9);
        assert_eq!(update.product.stock_at("branch-2"), 6);
        assert_eq!(update.product.total_stock(), 15);
        let kinds: Vec<MovementKind> = update.movements.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MovementKind::TransferOut, MovementKind::TransferIn]);
        assert_eq!(update.movements[1].counterpart_branch_id.as_deref(), Some("branch-1"));

        let err = catalog
            .transfer_stock(&product.id, "branch-1", "branch-2", 10, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InsufficientStock);
        let err = catalog
            .transfer_stock(&product.id, "branch-1", "branch-x", 1, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);

        let history = catalog.stock_movements(&product.id, None, 50).await.unwrap();
        let summary: Vec<(MovementKind, i64, i64)> = history
            .iter()
            .map(|m| (m.kind, m.quantity_before, m.quantity_after))
            .collect();
        assert_eq!(
            summary,
            vec![
                (MovementKind::TransferIn, 0, 6),
                (MovementKind::TransferOut, 15, 9),
                (MovementKind::Adjustment, 10, 15),
                (MovementKind::Set, 0, 10),
            ]
        );
        assert_eq!(history[3].reason.as_deref(), Some("opening count"));

        let branch_two = catalog
            .stock_movements(&product.id, Some("branch-2"), 50)
            .await
            .unwrap();
        assert_eq!(branch_two.len(), 1);

        let stored = catalog.get(&product.id).await.unwrap();
        assert_eq!(stored.version, 4);
    }

    #[tokio::test]
    async fn test_update_keeps_promotions_tiers_and_stock() {
        let catalog = catalog().await;
        let product = catalog.create(input("Rear Shock")).await.unwrap();
        let now = Utc::now();

        catalog
            .add_promotion(
                &product.id,
                NewPromotion {
                    name: "Weekend".to_string(),
                    price_levels: PriceLevels::from([(
                        "retail".to_string(),
                        Money::from_cents(9000),
                    )]),
                    start_date: now - Duration::hours(1),
                    end_date: now + Duration::days(2),
                    is_active: true,
                },
            )
            .await
            .unwrap();
        catalog
            .add_volume_discount(
                &product.id,
                NewVolumeDiscount {
                    min_quantity: 5,
                    discount_type: DiscountType::Percentage,
                    discount_value: 1000,
                    is_active: true,
                },
            )
            .await
            .unwrap();
        catalog.set_stock(&product.id, "branch-2", 8, None).await.unwrap();

        let mut change = input("Rear Shock Absorber");
        change.price_levels = PriceLevels::from([("retail".to_string(), Money::from_cents(12000))]);
        let updated = catalog.update(&product.id, change).await.unwrap();
        assert_eq!(updated.name, "Rear Shock Absorber");
        assert_eq!(updated.promotional_pricing.len(), 1);
        assert_eq!(updated.volume_discounts.len(), 1);
        assert_eq!(updated.stock_at("branch-2"), 8);

        let stored = catalog.get(&product.id).await.unwrap();
        assert_eq!(stored.promotional_pricing, updated.promotional_pricing);
        assert_eq!(stored.volume_discounts, updated.volume_discounts);
        assert_eq!(stored.stock_at("branch-2"), 8);
        assert_eq!(stored.price_level("retail"), Some(Money::from_cents(12000)));

        // Promotion price 90.00, then 10% off from five units.
        let price = catalog.effective_price(&product.id, "retail", 5, now).await.unwrap();
        assert_eq!(price.cents(), 8100);
        let price = catalog.effective_price(&product.id, "retail", 1, now).await.unwrap();
        assert_eq!(price.cents(), 9000);
    }

    #[tokio::test]
    async fn test_generated_identity_skips_taken_candidates() {
        let db = seeded_db().await;
        let catalog = ProductCatalog::new(db.clone());
        let mut taken = input("Taken");
        taken.sku = Some("PRD-000001-AAA".to_string());
        catalog.create(taken).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        let mut offered = Vec::new();
        let sku = claim_identity(tx.conn(), IdentityField::Sku, None, |rejected| {
            offered.push(rejected.len());
            if rejected.is_empty() {
                "PRD-000001-AAA".to_string()
            } else {
                "PRD-000001-AAB".to_string()
            }
        })
        .await
        .unwrap();
        assert_eq!(sku, "PRD-000001-AAB");
        assert_eq!(offered, vec![0, 1]);

        let err = claim_identity(tx.conn(), IdentityField::Sku, Some("PRD-000001-AAA"), |_| {
            unreachable!("supplied values are never regenerated")
        })
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DuplicateIdentity);
    }

    #[tokio::test]
    async fn test_list_filters_and_search() {
        let catalog = catalog().await;
        catalog.create(input("Brake Pad Front")).await.unwrap();
        catalog.create(input("Brake Lever")).await.unwrap();
        let mut draft = input("Headlight Bulb");
        draft.is_active = Some(false);
        catalog.create(draft).await.unwrap();

        let found = catalog
            .list(ProductFilter {
                search: Some("  brake ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let inactive = catalog
            .list(ProductFilter {
                is_active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].name, "Headlight Bulb");
    }

    #[tokio::test]
    async fn test_margin_report_values_stock() {
        let catalog = catalog().await;
        let product = catalog.create(input("Brake Shoe")).await.unwrap();
        catalog.set_stock(&product.id, "branch-1", 10, None).await.unwrap();
        let gone = catalog.create(input("Old Part")).await.unwrap();
        catalog.delete(&gone.id).await.unwrap();

        let report = catalog.margin_report(false).await.unwrap();
        assert_eq!(report.summary.total_products, 1);
        assert_eq!(report.summary.total_stock_units, 10);
        assert_eq!(report.summary.total_stock_value.cents(), 60000);
        assert_eq!(report.products[0].margins["retail"].margin_bps, Some(4000));
        assert_eq!(report.branches.len(), 2);

        let report = catalog.margin_report(true).await.unwrap();
        assert_eq!(report.summary.total_products, 2);
    }
}

//! # Request & Response Bodies
//!
//! The JSON contract of the HTTP API, kept apart from the domain types.
//!
//! ## Money at the Edge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client JSON            Boundary                   Engine               │
//! │                                                                         │
//! │  "retail": 29.99   ──► Decimal ──► round half     ──► Money(2999)       │
//! │  "retail": "29.99"      (number     away from zero                      │
//! │                          or string)  to 2 places                        │
//! │                                                                         │
//! │  "discount_value": 15 ──► same path ──────────────► 1500 bps           │
//! │                                                                         │
//! │  Money(8500)       ──► Amount(Decimal 85.00) ──► 85.0 (JSON number)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money and basis points are both fixed-point with two implied decimals,
//! so one conversion serves both.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::services::admin::InitOutcome;
use crate::services::catalog::{StockReading, StockUpdate};
use motopos_core::pricing::{AppliedPromotion, AppliedVolumeDiscount};
use motopos_core::report::{BranchStock, LevelMargin, ProductValuation, ReportSummary};
use motopos_core::{
    AdjustDirection, BranchInput, CompanyInput, DiscountType, MarginReport, Money, MovementKind,
    NewPromotion, NewVolumeDiscount, PriceQuote, Product, ProductInput, ProductStatus,
    PromotionalPricing, Role, RoleInput, StockLevels, StockMovement, User, ValidationError,
    VolumeDiscount, MAX_AMOUNT_CENTS,
};

// =============================================================================
// Decimal Conversion
// =============================================================================

/// Converts a decimal amount to hundredths, rounding half away from zero.
///
/// Magnitudes above [`MAX_AMOUNT_CENTS`] hundredths are rejected here, before
/// any arithmetic sees them.
pub fn to_hundredths(field: &str, value: Decimal) -> Result<i64, ValidationError> {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    let out_of_range = || ValidationError::OutOfRange {
        field: field.to_string(),
        min: -MAX_AMOUNT_CENTS / 100,
        max: MAX_AMOUNT_CENTS / 100,
    };
    let hundredths = i64::try_from(rounded.mantissa()).map_err(|_| out_of_range())?;
    if hundredths.unsigned_abs() > MAX_AMOUNT_CENTS as u64 {
        return Err(out_of_range());
    }
    Ok(hundredths)
}

pub fn to_money(field: &str, value: Decimal) -> Result<Money, ValidationError> {
    to_hundredths(field, value).map(Money::from_cents)
}

fn to_price_levels(
    field: &str,
    levels: BTreeMap<String, Decimal>,
) -> Result<BTreeMap<String, Money>, ValidationError> {
    levels
        .into_iter()
        .map(|(level, value)| {
            let money = to_money(&format!("{}.{}", field, level), value)?;
            Ok((level, money))
        })
        .collect()
}

/// A two-decimal amount rendered as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    /// From an integer count of hundredths (cents or basis points).
    pub fn from_hundredths(value: i64) -> Self {
        Amount(Decimal::new(value, 2))
    }
}

impl From<Money> for Amount {
    fn from(money: Money) -> Self {
        Amount::from_hundredths(money.cents())
    }
}

fn amounts(levels: &BTreeMap<String, Money>) -> BTreeMap<String, Amount> {
    levels
        .iter()
        .map(|(level, price)| (level.clone(), Amount::from(*price)))
        .collect()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /products/create` and `POST /products/{id}/update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductRequest {
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub brand_id: String,
    pub compatible_models: Vec<String>,
    pub unit_of_measure: String,
    pub purchase_price: Decimal,
    pub price_levels: BTreeMap<String, Decimal>,
    pub technical_specs: BTreeMap<String, String>,
    pub storage_location: Option<String>,
    pub tags: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub min_stock: i64,
    pub is_active: Option<bool>,
}

impl TryFrom<ProductRequest> for ProductInput {
    type Error = ValidationError;

    fn try_from(req: ProductRequest) -> Result<Self, Self::Error> {
        Ok(ProductInput {
            sku: req.sku.map(|s| s.trim().to_string()),
            barcode: req.barcode.map(|b| b.trim().to_string()),
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            brand_id: req.brand_id,
            compatible_models: req.compatible_models,
            unit_of_measure: req.unit_of_measure,
            purchase_price: to_money("purchase_price", req.purchase_price)?,
            price_levels: to_price_levels("price_levels", req.price_levels)?,
            technical_specs: req.technical_specs,
            storage_location: req.storage_location,
            tags: req.tags,
            labels: req.labels,
            min_stock: req.min_stock,
            is_active: req.is_active,
        })
    }
}

/// Body of `POST /products/{id}/promo`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromotionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_levels: BTreeMap<String, Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TryFrom<PromotionRequest> for NewPromotion {
    type Error = ValidationError;

    fn try_from(req: PromotionRequest) -> Result<Self, Self::Error> {
        Ok(NewPromotion {
            name: req.name,
            price_levels: to_price_levels("price_levels", req.price_levels)?,
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: req.is_active,
        })
    }
}

/// Body of `POST /products/{id}/volume-discount`.
///
/// `discount_value` is a percentage (`15` = 15 %) or an amount, per
/// `discount_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeDiscountRequest {
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TryFrom<VolumeDiscountRequest> for NewVolumeDiscount {
    type Error = ValidationError;

    fn try_from(req: VolumeDiscountRequest) -> Result<Self, Self::Error> {
        Ok(NewVolumeDiscount {
            min_quantity: req.min_quantity,
            discount_type: req.discount_type,
            discount_value: to_hundredths("discount_value", req.discount_value)?,
            is_active: req.is_active,
        })
    }
}

/// Body of `POST /products/{id}/stock`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockRequest {
    pub branch_id: String,
    pub stock_quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /products/{id}/stock/adjust`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustRequest {
    pub branch_id: String,
    #[serde(rename = "type")]
    pub direction: AdjustDirection,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /products/{id}/stock/transfer`.
#[derive(Debug, Clone, Deserialize)]
pub struct StockTransferRequest {
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_movement_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementQuery {
    pub branch_id: Option<String>,
    #[serde(default = "default_movement_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockQuery {
    pub branch_id: String,
}

fn default_level() -> String {
    motopos_core::RETAIL_LEVEL.to_string()
}

fn default_quantity() -> i64 {
    1
}

/// Query of `GET /products/{id}/price`. `at` defaults to now.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuery {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BranchRequest {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub manager_name: Option<String>,
    pub manager_phone: Option<String>,
    pub operating_hours: Option<String>,
    pub stock_capacity: i64,
    pub is_active: Option<bool>,
}

impl From<BranchRequest> for BranchInput {
    fn from(req: BranchRequest) -> Self {
        BranchInput {
            code: req.code,
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
            manager_name: req.manager_name,
            manager_phone: req.manager_phone,
            operating_hours: req.operating_hours,
            stock_capacity: req.stock_capacity,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

impl From<RoleRequest> for RoleInput {
    fn from(req: RoleRequest) -> Self {
        RoleInput {
            name: req.name,
            description: req.description,
            permissions: req.permissions,
        }
    }
}

/// Body for creating a category or brand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LookupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
}

impl From<CompanyRequest> for CompanyInput {
    fn from(req: CompanyRequest) -> Self {
        CompanyInput {
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
            tax_number: req.tax_number,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PromotionDto {
    pub position: i64,
    pub name: String,
    pub price_levels: BTreeMap<String, Amount>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&PromotionalPricing> for PromotionDto {
    fn from(p: &PromotionalPricing) -> Self {
        PromotionDto {
            position: p.position,
            name: p.name.clone(),
            price_levels: amounts(&p.price_levels),
            start_date: p.start_date,
            end_date: p.end_date,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

/// A tier as clients enter it: percent or amount.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeDiscountDto {
    pub position: i64,
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    pub discount_value: Amount,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&VolumeDiscount> for VolumeDiscountDto {
    fn from(v: &VolumeDiscount) -> Self {
        VolumeDiscountDto {
            position: v.position,
            min_quantity: v.min_quantity,
            discount_type: v.discount_type,
            discount_value: Amount::from_hundredths(v.discount_value),
            is_active: v.is_active,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDto {
    pub id: String,
    pub sku: String,
    pub barcode: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub brand_id: String,
    pub compatible_models: Vec<String>,
    pub unit_of_measure: String,
    pub purchase_price: Amount,
    pub price_levels: BTreeMap<String, Amount>,
    pub technical_specs: BTreeMap<String, String>,
    pub storage_location: Option<String>,
    pub tags: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub min_stock: i64,
    pub is_active: bool,
    pub status: ProductStatus,
    pub promotional_pricing: Vec<PromotionDto>,
    pub volume_discounts: Vec<VolumeDiscountDto>,
    pub stock: StockLevels,
    pub total_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            status: p.status(),
            total_stock: p.total_stock(),
            purchase_price: p.purchase_price.into(),
            price_levels: amounts(&p.price_levels),
            promotional_pricing: p.promotional_pricing.iter().map(PromotionDto::from).collect(),
            volume_discounts: p.volume_discounts.iter().map(VolumeDiscountDto::from).collect(),
            id: p.id,
            sku: p.sku,
            barcode: p.barcode,
            name: p.name,
            description: p.description,
            category_id: p.category_id,
            brand_id: p.brand_id,
            compatible_models: p.compatible_models,
            unit_of_measure: p.unit_of_measure,
            technical_specs: p.technical_specs,
            storage_location: p.storage_location,
            tags: p.tags,
            labels: p.labels,
            min_stock: p.min_stock,
            is_active: p.is_active,
            stock: p.stock,
            created_at: p.created_at,
            updated_at: p.updated_at,
            activated_at: p.activated_at,
            deleted_at: p.deleted_at,
            version: p.version,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDto {
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub total_stock: i64,
}

impl From<StockReading> for StockDto {
    fn from(r: StockReading) -> Self {
        StockDto {
            product_id: r.product_id,
            branch_id: r.branch_id,
            quantity: r.quantity,
            total_stock: r.total_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockMovementDto {
    pub id: i64,
    pub product_id: String,
    pub branch_id: String,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub quantity_before: i64,
    pub quantity_after: i64,
    /// Signed change, negative for OUT and TRANSFER_OUT.
    pub quantity: i64,
    pub counterpart_branch_id: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StockMovement> for StockMovementDto {
    fn from(m: StockMovement) -> Self {
        StockMovementDto {
            quantity: m.delta(),
            id: m.id,
            product_id: m.product_id,
            branch_id: m.branch_id,
            kind: m.kind,
            quantity_before: m.quantity_before,
            quantity_after: m.quantity_after,
            counterpart_branch_id: m.counterpart_branch_id,
            reason: m.reason,
            created_at: m.created_at,
        }
    }
}

/// Response of adjust and transfer.
#[derive(Debug, Clone, Serialize)]
pub struct StockUpdateDto {
    pub product: ProductDto,
    pub movements: Vec<StockMovementDto>,
}

impl From<StockUpdate> for StockUpdateDto {
    fn from(update: StockUpdate) -> Self {
        StockUpdateDto {
            product: update.product.into(),
            movements: update.movements.into_iter().map(StockMovementDto::from).collect(),
        }
    }
}

// =============================================================================
// Pricing
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AppliedTierDto {
    pub position: i64,
    pub min_quantity: i64,
    pub discount_type: DiscountType,
    pub discount_value: Amount,
}

impl From<AppliedVolumeDiscount> for AppliedTierDto {
    fn from(t: AppliedVolumeDiscount) -> Self {
        AppliedTierDto {
            position: t.position,
            min_quantity: t.min_quantity,
            discount_type: t.discount_type,
            discount_value: Amount::from_hundredths(t.discount_value),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteDto {
    pub product_id: String,
    pub price_level: String,
    pub quantity: i64,
    pub at: DateTime<Utc>,
    pub list_price: Option<Amount>,
    pub base_price: Amount,
    pub promotion: Option<AppliedPromotion>,
    pub volume_discount: Option<AppliedTierDto>,
    pub unit_price: Amount,
    pub line_total: Amount,
}

impl From<PriceQuote> for QuoteDto {
    fn from(q: PriceQuote) -> Self {
        QuoteDto {
            product_id: q.product_id,
            price_level: q.price_level,
            quantity: q.quantity,
            at: q.at,
            list_price: q.list_price.map(Amount::from),
            base_price: q.base_price.into(),
            promotion: q.promotion,
            volume_discount: q.volume_discount.map(AppliedTierDto::from),
            unit_price: q.unit_price.into(),
            line_total: q.line_total.into(),
        }
    }
}

// =============================================================================
// Margin Report
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LevelMarginDto {
    pub price: Amount,
    pub profit: Amount,
    /// Percent with two decimals; null when the price is zero.
    pub margin_percent: Option<Amount>,
}

impl From<&LevelMargin> for LevelMarginDto {
    fn from(m: &LevelMargin) -> Self {
        LevelMarginDto {
            price: m.price.into(),
            profit: m.profit.into(),
            margin_percent: m.margin_bps.map(Amount::from_hundredths),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductMarginDto {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub purchase_price: Amount,
    pub margins: BTreeMap<String, LevelMarginDto>,
    pub total_stock: i64,
    pub stock_value: Amount,
    pub below_cost_levels: Vec<String>,
    pub min_stock: i64,
    pub low_stock: bool,
    pub low_stock_branches: Vec<String>,
}

impl From<ProductValuation> for ProductMarginDto {
    fn from(v: ProductValuation) -> Self {
        ProductMarginDto {
            margins: v
                .margins
                .iter()
                .map(|(level, margin)| (level.clone(), LevelMarginDto::from(margin)))
                .collect(),
            purchase_price: v.purchase_price.into(),
            stock_value: v.stock_value.into(),
            product_id: v.product_id,
            sku: v.sku,
            name: v.name,
            status: v.status,
            total_stock: v.total_stock,
            below_cost_levels: v.below_cost_levels,
            min_stock: v.min_stock,
            low_stock: v.low_stock,
            low_stock_branches: v.low_stock_branches,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummaryDto {
    pub total_products: i64,
    pub total_stock_units: i64,
    pub total_stock_value: Amount,
    /// Level → mean margin percent.
    pub average_margins: BTreeMap<String, Amount>,
    pub low_stock_count: i64,
    pub negative_margin_count: i64,
}

impl From<ReportSummary> for ReportSummaryDto {
    fn from(s: ReportSummary) -> Self {
        ReportSummaryDto {
            total_products: s.total_products,
            total_stock_units: s.total_stock_units,
            total_stock_value: s.total_stock_value.into(),
            average_margins: s
                .average_margins
                .into_iter()
                .map(|(level, bps)| (level, Amount::from_hundredths(bps)))
                .collect(),
            low_stock_count: s.low_stock_count,
            negative_margin_count: s.negative_margin_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarginReportDto {
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductMarginDto>,
    pub summary: ReportSummaryDto,
    pub branches: Vec<BranchStock>,
}

impl From<MarginReport> for MarginReportDto {
    fn from(r: MarginReport) -> Self {
        MarginReportDto {
            generated_at: r.generated_at,
            products: r.products.into_iter().map(ProductMarginDto::from).collect(),
            summary: r.summary.into(),
            branches: r.branches,
        }
    }
}

// =============================================================================
// Users & Bootstrap
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummaryDto {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<Role> for RoleSummaryDto {
    fn from(role: Role) -> Self {
        RoleSummaryDto {
            id: role.id,
            name: role.name,
            permissions: role.permissions,
        }
    }
}

/// A user as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role_id: String,
    pub branch_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleSummaryDto>,
}

impl UserDto {
    pub fn new(user: User, role: Option<Role>) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role_id: user.role_id,
            branch_id: user.branch_id,
            is_active: user.is_active,
            created_at: user.created_at,
            role: role.map(RoleSummaryDto::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResponse {
    pub message: String,
    pub roles_created: usize,
    pub admin_created: bool,
    pub company_created: bool,
}

impl From<InitOutcome> for InitResponse {
    fn from(outcome: InitOutcome) -> Self {
        let message = if outcome.already_initialized() {
            "System already initialized"
        } else {
            "System initialized"
        };
        InitResponse {
            message: message.to_string(),
            roles_created: outcome.roles_created,
            admin_created: outcome.admin_created,
            company_created: outcome.company_created,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

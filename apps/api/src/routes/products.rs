//! Product handlers: lifecycle, pricing, stock and the margin report.
//!
//! Request bodies carry decimal money; [`crate::dto`] converts it to cents
//! before anything reaches the catalog.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::dto::{
    MarginReportDto, MovementQuery, PriceQuery, ProductDto, ProductRequest, PromotionRequest,
    QuoteDto, ReportQuery, StockAdjustRequest, StockDto, StockMovementDto, StockQuery,
    StockRequest, StockTransferRequest, StockUpdateDto, VolumeDiscountRequest,
};
use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use motopos_core::ProductFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/margin-report", get(margin_report))
        .route("/products/create", post(create_product))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/update", post(update_product))
        .route("/products/{id}/toggle", post(toggle_product))
        .route("/products/{id}/delete", post(delete_product))
        .route("/products/{id}/promo", post(add_promotion))
        .route("/products/{id}/volume-discount", post(add_volume_discount))
        .route("/products/{id}/price", get(price))
        .route("/products/{id}/stock", get(get_stock).post(set_stock))
        .route("/products/{id}/stock/adjust", post(adjust_stock))
        .route("/products/{id}/stock/transfer", post(transfer_stock))
        .route("/products/{id}/stock/movements", get(stock_movements))
}

// =============================================================================
// Lifecycle
// =============================================================================

pub async fn list_products(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<ProductDto>>> {
    let products = state.catalog.list(filter).await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

pub async fn get_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDto>> {
    Ok(Json(state.catalog.get(&id).await?.into()))
}

/// Creates a product. SKU and barcode are generated when omitted.
pub async fn create_product(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> ApiResult<Json<ProductDto>> {
    let product = state.catalog.create(body.try_into()?).await?;
    Ok(Json(product.into()))
}

pub async fn update_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> ApiResult<Json<ProductDto>> {
    let product = state.catalog.update(&id, body.try_into()?).await?;
    Ok(Json(product.into()))
}

pub async fn toggle_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDto>> {
    Ok(Json(state.catalog.toggle(&id).await?.into()))
}

pub async fn delete_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDto>> {
    Ok(Json(state.catalog.delete(&id).await?.into()))
}

// =============================================================================
// Pricing
// =============================================================================

pub async fn add_promotion(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PromotionRequest>,
) -> ApiResult<Json<ProductDto>> {
    let product = state.catalog.add_promotion(&id, body.try_into()?).await?;
    Ok(Json(product.into()))
}

pub async fn add_volume_discount(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VolumeDiscountRequest>,
) -> ApiResult<Json<ProductDto>> {
    let product = state.catalog.add_volume_discount(&id, body.try_into()?).await?;
    Ok(Json(product.into()))
}

/// Effective unit price and its breakdown.
pub async fn price(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PriceQuery>,
) -> ApiResult<Json<QuoteDto>> {
    let at = query.at.unwrap_or_else(Utc::now);
    let quote = state
        .catalog
        .quote(&id, query.level.trim(), query.quantity, at)
        .await?;
    Ok(Json(quote.into()))
}

// =============================================================================
// Stock
// =============================================================================

pub async fn get_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<StockQuery>,
) -> ApiResult<Json<StockDto>> {
    Ok(Json(state.catalog.get_stock(&id, &query.branch_id).await?.into()))
}

/// Overwrites the quantity at one branch.
pub async fn set_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockRequest>,
) -> ApiResult<Json<ProductDto>> {
    let product = state
        .catalog
        .set_stock(&id, &body.branch_id, body.stock_quantity, body.reason.as_deref())
        .await?;
    Ok(Json(product.into()))
}

/// Adds (`IN`) or removes (`OUT`) units at one branch.
pub async fn adjust_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockAdjustRequest>,
) -> ApiResult<Json<StockUpdateDto>> {
    let update = state
        .catalog
        .adjust_stock(
            &id,
            &body.branch_id,
            body.direction,
            body.quantity,
            body.reason.as_deref(),
        )
        .await?;
    Ok(Json(update.into()))
}

pub async fn transfer_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockTransferRequest>,
) -> ApiResult<Json<StockUpdateDto>> {
    let update = state
        .catalog
        .transfer_stock(
            &id,
            &body.from_branch_id,
            &body.to_branch_id,
            body.quantity,
            body.reason.as_deref(),
        )
        .await?;
    Ok(Json(update.into()))
}

pub async fn stock_movements(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<MovementQuery>,
) -> ApiResult<Json<Vec<StockMovementDto>>> {
    let movements = state
        .catalog
        .stock_movements(&id, query.branch_id.as_deref(), query.limit)
        .await?;
    Ok(Json(movements.into_iter().map(StockMovementDto::from).collect()))
}

// =============================================================================
// Reporting
// =============================================================================

pub async fn margin_report(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<MarginReportDto>> {
    let report = state.catalog.margin_report(query.include_deleted).await?;
    Ok(Json(report.into()))
}

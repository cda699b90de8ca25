//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness + database check (public)
//! GET  /init                            - Idempotent bootstrap (public)
//!
//! # Auth
//! POST /auth/login                      - Username/password → bearer token (public)
//! GET  /auth/me                         - Current user with role
//!
//! # Company
//! GET  /company                         - Store profile
//! POST /company                         - Create profile
//! POST /company/update                  - Update profile
//!
//! # Branches
//! GET  /branches                        - List branches
//! POST /branches/create                 - Create branch
//! POST /branches/{id}/update|toggle|delete
//!
//! # Roles
//! GET  /roles                           - List roles
//! POST /roles/create                    - Create role
//! POST /roles/{id}/update|delete
//!
//! # Categories & Brands
//! GET  /categories, /brands             - List
//! POST /categories/create, /brands/create
//! POST /categories/{id}/delete, /brands/{id}/delete
//!
//! # Products
//! GET  /products                        - List (category_id, brand_id, is_active, search)
//! GET  /products/margin-report          - Margin & valuation report
//! POST /products/create                 - Create product
//! GET  /products/{id}                   - Product detail
//! POST /products/{id}/update|toggle|delete
//! POST /products/{id}/promo             - Append promotion
//! POST /products/{id}/volume-discount   - Append volume tier
//! GET  /products/{id}/price             - Price quote (level, quantity, at)
//! GET  /products/{id}/stock             - Stock at one branch (branch_id)
//! POST /products/{id}/stock             - Set stock at one branch
//! POST /products/{id}/stock/adjust      - IN/OUT adjustment at one branch
//! POST /products/{id}/stock/transfer    - Move units between branches
//! GET  /products/{id}/stock/movements   - Movement history (branch_id, limit)
//! ```
//!
//! Everything except `/health`, `/init` and `/auth/login` requires
//! `Authorization: Bearer <token>`.

pub mod auth;
pub mod branches;
pub mod company;
pub mod lookups;
pub mod products;
pub mod roles;
pub mod system;

use axum::Router;

use crate::AppState;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(system::router())
        .merge(auth::router())
        .merge(company::router())
        .merge(branches::router())
        .merge(roles::router())
        .merge(lookups::router())
        .merge(products::router())
}

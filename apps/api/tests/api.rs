//! HTTP-level tests driving the router in memory.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use motopos_api::{app, ApiConfig, AppState};

struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    async fn start() -> Self {
        let state = AppState::connect(ApiConfig::for_tests()).await.unwrap();
        let router = app(state);

        let (status, _) = call(&router, "GET", "/init", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &router,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "admin123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        TestApp { router, token }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        call(&self.router, "GET", uri, Some(&self.token), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        call(&self.router, "POST", uri, Some(&self.token), Some(body)).await
    }

    /// Creates a category, a brand and a branch; returns their ids.
    async fn reference_data(&self) -> (String, String, String) {
        let (_, category) = self.post("/categories/create", json!({ "name": "Brakes" })).await;
        let (_, brand) = self.post("/brands/create", json!({ "name": "Nissin" })).await;
        let (_, branch) = self
            .post(
                "/branches/create",
                json!({ "code": "JKT-01", "name": "Jakarta Pusat", "stock_capacity": 1000 }),
            )
            .await;
        (
            category["id"].as_str().unwrap().to_string(),
            brand["id"].as_str().unwrap().to_string(),
            branch["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_product(&self, category: &str, brand: &str, extra: Value) -> Value {
        let mut body = json!({
            "name": "Brake Pad Front",
            "category_id": category,
            "brand_id": brand,
            "unit_of_measure": "SET",
            "purchase_price": 60,
            "price_levels": { "retail": 100, "wholesale": 90 }
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        let (status, product) = self.post("/products/create", body).await;
        assert_eq!(status, StatusCode::OK, "{product}");
        product
    }
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn assert_amount(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap_or_else(|| panic!("not a number: {value}"));
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::start().await;

    let (status, body) = call(&app.router, "GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = call(&app.router, "GET", "/products", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::start().await;

    let (status, _) = call(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"]["name"], "Admin");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let app = TestApp::start().await;
    let (status, body) = call(&app.router, "GET", "/init", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "System already initialized");

    let (_, roles) = app.get("/roles").await;
    assert_eq!(roles.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_generates_sku_and_barcode() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;

    let product = app.create_product(&category, &brand, json!({})).await;
    assert!(product["sku"].as_str().unwrap().starts_with("PRD"));
    assert!(product["barcode"].as_str().unwrap().len() >= 10);
    assert_eq!(product["status"], "active");
    assert_eq!(product["version"], 1);
    assert_amount(&product["price_levels"]["retail"], 100.0);

    let other = app.create_product(&category, &brand, json!({ "name": "Brake Pad Rear" })).await;
    assert_ne!(product["sku"], other["sku"]);
    assert_ne!(product["barcode"], other["barcode"]);
}

#[tokio::test]
async fn test_volume_discount_tiers() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    let (status, updated) = app
        .post(
            &format!("/products/{id}/volume-discount"),
            json!({ "min_quantity": 10, "discount_type": "percentage", "discount_value": 15 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["volume_discounts"][0]["position"], 0);
    assert_amount(&updated["volume_discounts"][0]["discount_value"], 15.0);

    let (_, quote) = app.get(&format!("/products/{id}/price?level=retail&quantity=10")).await;
    assert_amount(&quote["unit_price"], 85.0);
    assert_amount(&quote["line_total"], 850.0);
    assert_eq!(quote["volume_discount"]["min_quantity"], 10);

    let (_, quote) = app.get(&format!("/products/{id}/price?level=retail&quantity=9")).await;
    assert_amount(&quote["unit_price"], 100.0);
    assert!(quote["volume_discount"].is_null());

    let (status, body) = app.get(&format!("/products/{id}/price?level=vip")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PRICE_LEVEL");

    let (status, _) = app.get(&format!("/products/{id}/price?quantity=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_active_promotion_overrides_price() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    let (status, _) = app
        .post(
            &format!("/products/{id}/promo"),
            json!({
                "name": "Ramadan Sale",
                "price_levels": { "retail": "29.99" },
                "start_date": "2020-01-01T00:00:00Z",
                "end_date": "2099-12-31T23:59:59Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, quote) = app.get(&format!("/products/{id}/price")).await;
    assert_amount(&quote["unit_price"], 29.99);
    assert_eq!(quote["promotion"]["name"], "Ramadan Sale");

    let (_, quote) = app
        .get(&format!("/products/{id}/price?at=2019-06-01T00:00:00Z"))
        .await;
    assert_amount(&quote["unit_price"], 100.0);

    let (status, body) = app
        .post(
            &format!("/products/{id}/promo"),
            json!({
                "name": "Backwards",
                "price_levels": { "retail": 50 },
                "start_date": "2030-01-02T00:00:00Z",
                "end_date": "2030-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_stock_set_and_read() {
    let app = TestApp::start().await;
    let (category, brand, branch) = app.reference_data().await;
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    let (status, updated) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": 50 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"][branch.as_str()], 50);
    assert_eq!(updated["total_stock"], 50);

    let (_, updated) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": 0 }),
        )
        .await;
    assert_eq!(updated["total_stock"], 0);

    let (status, reading) = app
        .get(&format!("/products/{id}/stock?branch_id={branch}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reading["quantity"], 0);

    let (status, _) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": -5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": "no-such-branch", "stock_quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_values_are_rejected_and_report_still_served() {
    let app = TestApp::start().await;
    let (category, brand, branch) = app.reference_data().await;
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": 100000000000000000i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, report) = app.get("/products/margin-report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["summary"]["total_stock_units"], 0);

    let (status, body) = app
        .post(
            "/products/create",
            json!({
                "name": "Gold Plated Exhaust",
                "category_id": category,
                "brand_id": brand,
                "purchase_price": "100000000000000",
                "price_levels": { "retail": "100000000000000" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // At the price cap, a billion units no longer fits a stock value.
    let pricey = app
        .create_product(
            &category,
            &brand,
            json!({ "purchase_price": "1000000000000", "price_levels": { "retail": "1000000000000" } }),
        )
        .await;
    let pricey_id = pricey["id"].as_str().unwrap();
    let (status, body) = app
        .post(
            &format!("/products/{pricey_id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": 1000000000 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["code"], "VALUE_OVERFLOW");

    let (status, _) = app.get("/products/margin-report").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stock_adjust_transfer_and_history() {
    let app = TestApp::start().await;
    let (category, brand, branch) = app.reference_data().await;
    let (_, second) = app
        .post("/branches/create", json!({ "code": "BDG-01", "name": "Bandung" }))
        .await;
    let second = second["id"].as_str().unwrap().to_string();
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    app.post(
        &format!("/products/{id}/stock"),
        json!({ "branch_id": branch, "stock_quantity": 10, "reason": "stock take" }),
    )
    .await;

    let (status, body) = app
        .post(
            &format!("/products/{id}/stock/adjust"),
            json!({ "branch_id": branch, "type": "IN", "quantity": 5, "reason": "delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["product"]["stock"][branch.as_str()], 15);
    assert_eq!(body["movements"][0]["quantity"], 5);

    let (status, body) = app
        .post(
            &format!("/products/{id}/stock/adjust"),
            json!({ "branch_id": branch, "type": "OUT", "quantity": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = app
        .post(
            &format!("/products/{id}/stock/transfer"),
            json!({ "from_branch_id": branch, "to_branch_id": second, "quantity": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["product"]["total_stock"], 15);
    assert_eq!(body["product"]["stock"][second.as_str()], 6);
    assert_eq!(body["movements"][0]["type"], "transfer_out");
    assert_eq!(body["movements"][0]["quantity"], -6);

    let (status, history) = app.get(&format!("/products/{id}/stock/movements")).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["transfer_in", "transfer_out", "adjustment", "set"]);
    assert_eq!(history[3]["reason"], "stock take");
    assert_eq!(history[3]["quantity_before"], 0);

    let (_, only_second) = app
        .get(&format!("/products/{id}/stock/movements?branch_id={second}&limit=10"))
        .await;
    assert_eq!(only_second.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/products/no-such-product/stock/movements").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_system_role_cannot_be_deleted() {
    let app = TestApp::start().await;
    let (_, roles) = app.get("/roles").await;
    let admin_role = roles
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "Admin")
        .unwrap();
    let id = admin_role["id"].as_str().unwrap();

    let (status, body) = app.post(&format!("/roles/{id}/delete"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SYSTEM_ROLE_PROTECTED");

    let (_, roles) = app.get("/roles").await;
    assert_eq!(roles.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;
    app.create_product(&category, &brand, json!({ "sku": "PRD-PAD-001" })).await;

    let (status, body) = app
        .post(
            "/products/create",
            json!({
                "sku": "PRD-PAD-001",
                "name": "Brake Pad Copy",
                "category_id": category,
                "brand_id": brand,
                "price_levels": { "retail": 100 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_IDENTITY");
}

#[tokio::test]
async fn test_retail_price_required() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;

    let (status, body) = app
        .post(
            "/products/create",
            json!({
                "name": "Wholesale Only",
                "category_id": category,
                "brand_id": brand,
                "price_levels": { "wholesale": 90 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("retail"));
}

#[tokio::test]
async fn test_deleted_product_returns_not_found() {
    let app = TestApp::start().await;
    let (category, brand, branch) = app.reference_data().await;
    let product = app.create_product(&category, &brand, json!({})).await;
    let id = product["id"].as_str().unwrap();

    let (status, deleted) = app.post(&format!("/products/{id}/delete"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["status"], "deleted");

    let (status, _) = app.get(&format!("/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post(&format!("/products/{id}/toggle"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post(
            &format!("/products/{id}/stock"),
            json!({ "branch_id": branch, "stock_quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app.get("/products").await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_toggle() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;
    let product = app
        .create_product(&category, &brand, json!({ "is_active": false }))
        .await;
    assert_eq!(product["status"], "draft");
    let id = product["id"].as_str().unwrap();

    let (status, updated) = app
        .post(
            &format!("/products/{id}/update"),
            json!({
                "name": "Brake Pad Front Sintered",
                "category_id": category,
                "brand_id": brand,
                "purchase_price": 65,
                "price_levels": { "retail": 110 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["name"], "Brake Pad Front Sintered");
    assert_eq!(updated["sku"], product["sku"]);
    assert_eq!(updated["status"], "draft");
    assert_eq!(updated["version"], 2);

    let (_, toggled) = app.post(&format!("/products/{id}/toggle"), json!({})).await;
    assert_eq!(toggled["status"], "active");

    let (status, body) = app
        .post(
            &format!("/products/{id}/update"),
            json!({
                "sku": "PRD-CHANGED",
                "name": "Brake Pad Front Sintered",
                "category_id": category,
                "brand_id": brand,
                "price_levels": { "retail": 110 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("immutable"));
}

#[tokio::test]
async fn test_search_filters() {
    let app = TestApp::start().await;
    let (category, brand, _) = app.reference_data().await;
    app.create_product(&category, &brand, json!({ "name": "Brake Pad Front" })).await;
    app.create_product(&category, &brand, json!({ "name": "Brake Lever" })).await;
    app.create_product(&category, &brand, json!({ "name": "Spark Plug", "is_active": false }))
        .await;

    let (_, found) = app.get("/products?search=BRAKE").await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, found) = app.get("/products?is_active=false").await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, found) = app
        .get(&format!("/products?brand_id={brand}&search=lever"))
        .await;
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_margin_report() {
    let app = TestApp::start().await;
    let (category, brand, branch) = app.reference_data().await;
    let product = app
        .create_product(&category, &brand, json!({ "min_stock": 20 }))
        .await;
    let id = product["id"].as_str().unwrap();
    app.post(
        &format!("/products/{id}/stock"),
        json!({ "branch_id": branch, "stock_quantity": 12 }),
    )
    .await;

    let (status, report) = app.get("/products/margin-report").await;
    assert_eq!(status, StatusCode::OK);

    let line = &report["products"][0];
    assert_amount(&line["margins"]["retail"]["profit"], 40.0);
    assert_amount(&line["margins"]["retail"]["margin_percent"], 40.0);
    assert_amount(&line["stock_value"], 720.0);
    assert_eq!(line["low_stock"], true);
    assert_eq!(line["low_stock_branches"], json!([branch]));

    assert_eq!(report["summary"]["total_products"], 1);
    assert_eq!(report["summary"]["total_stock_units"], 12);
    assert_amount(&report["summary"]["total_stock_value"], 720.0);
    assert_eq!(report["summary"]["low_stock_count"], 1);
    assert_eq!(report["branches"][0]["total_units"], 12);

    let (status, body) = app.post(&format!("/branches/{branch}/delete"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "IN_USE");
}

//! # Seed Data Generator
//!
//! Populates the database with motorbike-parts demo data for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p motopos-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p motopos-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p motopos-db --bin seed -- --db ./data/motopos.db
//! ```
//!
//! ## Generated Data
//! - Branches: Jakarta, Bandung, Surabaya (plus a warehouse)
//! - Categories: Brakes, Engine, Electrical, Suspension, Drivetrain, Tyres, Oils
//! - Brands: OEM and aftermarket makers
//!
//! Each product has:
//! - Generated `PRD-` SKU and in-store EAN-13 barcode
//! - `retail`, `wholesale` and `member` price levels above a purchase price
//! - Stock at every branch, and a volume tier on every fifth product

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::env;

use chrono::{DateTime, Utc};
use motopos_core::{
    Branch, Brand, Category, DiscountType, IdentityGenerator, Money, MovementKind,
    NewStockMovement, PriceLevels, Product, VolumeDiscount,
};
use motopos_db::{
    generate_id, BranchRepository, BrandRepository, CategoryRepository, Database, DbConfig,
    ProductRepository, StockRepository,
};
use rand::Rng;

/// (code, name, stock_capacity)
const BRANCHES: &[(&str, &str, i64)] = &[
    ("JKT-01", "Jakarta Pusat", 5_000),
    ("BDG-01", "Bandung Dago", 3_000),
    ("SBY-01", "Surabaya Kertajaya", 3_000),
    ("WH-01", "Central Warehouse", 0),
];

/// Category name with part names and their unit of measure.
const CATEGORIES: &[(&str, &[(&str, &str)])] = &[
    (
        "Brakes",
        &[
            ("Brake Pad Front", "SET"),
            ("Brake Pad Rear", "SET"),
            ("Brake Shoe", "SET"),
            ("Brake Disc 220mm", "PCS"),
            ("Brake Lever", "PCS"),
            ("Brake Fluid DOT4", "BTL"),
        ],
    ),
    (
        "Engine",
        &[
            ("Piston Kit", "SET"),
            ("Cylinder Gasket", "PCS"),
            ("Spark Plug", "PCS"),
            ("Air Filter", "PCS"),
            ("Carburetor Repair Kit", "SET"),
            ("Valve Set", "SET"),
        ],
    ),
    (
        "Electrical",
        &[
            ("Battery 12V 5Ah", "PCS"),
            ("Headlamp Bulb H4", "PCS"),
            ("Turn Signal Relay", "PCS"),
            ("CDI Unit", "PCS"),
            ("Starter Relay", "PCS"),
        ],
    ),
    (
        "Suspension",
        &[
            ("Rear Shock Absorber", "PCS"),
            ("Fork Oil Seal", "SET"),
            ("Fork Spring", "SET"),
        ],
    ),
    (
        "Drivetrain",
        &[
            ("Chain Kit 428", "SET"),
            ("Drive Belt", "PCS"),
            ("Clutch Plate", "SET"),
            ("Roller Weight 12g", "SET"),
        ],
    ),
    (
        "Tyres",
        &[
            ("Tubeless Tyre 80/90-14", "PCS"),
            ("Tubeless Tyre 90/90-14", "PCS"),
            ("Inner Tube 17", "PCS"),
        ],
    ),
    (
        "Oils",
        &[
            ("Engine Oil 10W-40 1L", "BTL"),
            ("Gear Oil 120ml", "BTL"),
            ("Coolant 500ml", "BTL"),
        ],
    ),
];

const BRANDS: &[&str] = &["Honda Genuine", "Yamaha Genuine", "NGK", "Nissin", "Federal", "Aspira"];

const MODELS: &[&str] = &[
    "Honda Beat",
    "Honda Vario 125",
    "Yamaha NMAX",
    "Yamaha Aerox",
    "Suzuki Satria",
    "Kawasaki Ninja 250",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./motopos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Moto POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./motopos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Moto POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let mut tx = db.begin_write().await?;

    let mut branches: Vec<Branch> = Vec::new();
    for (code, name, stock_capacity) in BRANCHES {
        let branch = Branch {
            id: generate_id(),
            code: code.to_string(),
            name: name.to_string(),
            address: None,
            phone: None,
            email: None,
            manager_name: None,
            manager_phone: None,
            operating_hours: Some("08:00-20:00".to_string()),
            stock_capacity: *stock_capacity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        BranchRepository::insert(tx.conn(), &branch).await?;
        branches.push(branch);
    }
    println!("✓ {} branches", branches.len());

    let mut brands: Vec<Brand> = Vec::new();
    for name in BRANDS {
        brands.push(BrandRepository::create(tx.conn(), generate_id(), name.to_string(), None, now).await?);
    }

    let mut categories: Vec<(Category, &[(&str, &str)])> = Vec::new();
    for (name, parts) in CATEGORIES {
        let category =
            CategoryRepository::create(tx.conn(), generate_id(), name.to_string(), None, now).await?;
        categories.push((category, *parts));
    }
    println!("✓ {} categories, {} brands", categories.len(), brands.len());

    println!();
    println!("Generating products...");

    let mut rng = rand::rng();
    let mut identities = IdentityGenerator::new(rand::rng());
    let (mut skus, mut barcodes) = (HashSet::new(), HashSet::new());
    let start = std::time::Instant::now();

    let mut generated = 0;
    'outer: loop {
        for (category, parts) in &categories {
            for (part, unit) in parts.iter() {
                if generated >= count {
                    break 'outer;
                }

                let brand = &brands[rng.random_range(0..brands.len())];
                let model = MODELS[rng.random_range(0..MODELS.len())];
                let sku = identities.generate_sku(now, &skus);
                let barcode = identities.generate_barcode(now, &barcodes);
                skus.insert(sku.clone());
                barcodes.insert(barcode.clone());

                let product = generate_product(
                    &mut rng,
                    sku,
                    barcode,
                    format!("{} {} ({})", brand.name, part, model),
                    &category.id,
                    &brand.id,
                    model,
                    unit,
                    now,
                );

                ProductRepository::insert(tx.conn(), &product).await?;

                if generated % 5 == 0 {
                    let tier = VolumeDiscount {
                        position: 0,
                        min_quantity: 10,
                        discount_type: DiscountType::Percentage,
                        discount_value: 500,
                        is_active: true,
                        created_at: now,
                    };
                    ProductRepository::insert_volume_discount(tx.conn(), &product.id, &tier).await?;
                }

                for branch in &branches {
                    let quantity = rng.random_range(0..=40);
                    StockRepository::set(tx.conn(), &product.id, &branch.id, quantity, now).await?;
                    let opening = NewStockMovement {
                        product_id: product.id.clone(),
                        branch_id: branch.id.clone(),
                        kind: MovementKind::Set,
                        quantity_before: 0,
                        quantity_after: quantity,
                        counterpart_branch_id: None,
                        reason: Some("seed".to_string()),
                    };
                    StockRepository::record(tx.conn(), &opening, now).await?;
                }

                generated += 1;
                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    tx.commit().await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product priced at a 25-60 % markup over its purchase price.
#[allow(clippy::too_many_arguments)]
fn generate_product(
    rng: &mut impl Rng,
    sku: String,
    barcode: String,
    name: String,
    category_id: &str,
    brand_id: &str,
    model: &str,
    unit: &str,
    now: DateTime<Utc>,
) -> Product {
    // Rp-style round prices in cents: 15.00 - 850.00
    let purchase = rng.random_range(15..=850) * 100;
    let markup_bps = rng.random_range(2_500..=6_000);
    let retail = purchase + purchase * markup_bps / 10_000;

    let mut price_levels = PriceLevels::new();
    price_levels.insert("retail".to_string(), Money::from_cents(retail));
    price_levels.insert("wholesale".to_string(), Money::from_cents(retail * 90 / 100));
    price_levels.insert("member".to_string(), Money::from_cents(retail * 95 / 100));

    Product {
        id: generate_id(),
        sku,
        barcode,
        name,
        description: None,
        category_id: category_id.to_string(),
        brand_id: brand_id.to_string(),
        compatible_models: vec![model.to_string()],
        unit_of_measure: unit.to_string(),
        purchase_price: Money::from_cents(purchase),
        price_levels,
        technical_specs: BTreeMap::new(),
        storage_location: Some(format!("R{}-S{}", rng.random_range(1..=12), rng.random_range(1..=6))),
        tags: BTreeSet::new(),
        labels: BTreeSet::new(),
        min_stock: 5,
        is_active: true,
        promotional_pricing: Vec::new(),
        volume_discounts: Vec::new(),
        stock: BTreeMap::new(),
        created_at: now,
        updated_at: now,
        activated_at: Some(now),
        deleted_at: None,
        version: 1,
    }
}

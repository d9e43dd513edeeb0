//! # Seed Data Generator
//!
//! Populates the database with serialized products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p stockscan-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockscan-db --bin seed -- --count 1000
//!
//! # Specify database path and store
//! cargo run -p stockscan-db --bin seed -- --db ./data/stockscan.db --store store-2
//! ```
//!
//! Each product gets:
//! - A name from a device model list plus a color
//! - 1 to 6 unit codes shaped like 15-digit IMEIs
//! - A storage tag per unit (64GB / 128GB / 256GB / 512GB)
//! - An inventory record seeded with one available unit per code

use std::env;

use stockscan_core::{InventoryRecord, Product};
use stockscan_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Device models for realistic test data
const MODELS: &[(&str, i64)] = &[
    ("Phone X", 49_900),
    ("Phone X Pro", 69_900),
    ("Phone Y", 29_900),
    ("Phone Y Lite", 19_900),
    ("Tablet S", 39_900),
    ("Tablet S Max", 59_900),
    ("Watch One", 14_900),
    ("Buds Two", 7_900),
];

const COLORS: &[&str] = &["Black", "White", "Blue", "Red", "Green"];

/// Storage variants used as unit tags
const STORAGE_TAGS: &[&str] = &["64GB", "128GB", "256GB", "512GB"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockscan_dev.db");
    let mut store_id = String::from("store-1");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockscan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>     Database file path (default: ./stockscan_dev.db)");
                println!("  -s, --store <ID>    Store id (default: store-1)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, count, store_id = %store_id, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count(&store_id).await?;
    if existing > 0 {
        warn!(existing, "Store already has products; skipping seed to avoid duplicates");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut units = 0;

    for seed in 0..count {
        let product = generate_product(&store_id, seed);

        let product = match db.products().insert(&product).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(name = %product.name, error = %e, "Failed to insert product");
                continue;
            }
        };

        db.inventory()
            .insert_if_absent(&InventoryRecord::seeded_from(&product))
            .await?;

        generated += 1;
        units += product.unit_codes.len();

        if generated % 50 == 0 {
            info!(generated, "Progress");
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        units,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    if let Some(sample) = db.products().list_by_store(&store_id).await?.first() {
        if let Some(code) = sample.unit_codes.first() {
            let found = db.products().find_by_code(&store_id, code).await?;
            info!(code = %code, owner = ?found.map(|p| p.name), "Verified unit code lookup");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockscan=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Generates a single product with serialized units.
fn generate_product(store_id: &str, seed: usize) -> Product {
    let (model, base_price) = MODELS[seed % MODELS.len()];
    let color = COLORS[(seed / MODELS.len()) % COLORS.len()];
    let batch = seed / (MODELS.len() * COLORS.len());

    let name = if batch == 0 {
        format!("{model} {color}")
    } else {
        format!("{model} {color} #{}", batch + 1)
    };

    let unit_count = 1 + (seed * 7) % 6;
    let codes: Vec<String> = (0..unit_count).map(|unit| imei_like(seed, unit)).collect();
    let tags: Vec<String> = (0..unit_count)
        .map(|unit| STORAGE_TAGS[(seed + unit) % STORAGE_TAGS.len()].to_string())
        .collect();

    Product::new(Uuid::new_v4().to_string(), store_id, name, base_price)
        .with_units(codes, tags)
        .with_stocked_qty(unit_count as i64)
}

/// 15 digits: a fixed 8-digit type prefix, then product and unit serials.
fn imei_like(seed: usize, unit: usize) -> String {
    format!("35693803{:05}{:02}", seed % 100_000, unit)
}

//! # Seed Data Generator
//!
//! Populates a database with a demo pharmacy for development.
//!
//! ## Usage
//! ```bash
//! # One branch (default)
//! cargo run -p apotheca-db --bin seed
//!
//! # Three branches
//! cargo run -p apotheca-db --bin seed -- --branches 3
//!
//! # Specify database path
//! cargo run -p apotheca-db --bin seed -- --db ./data/apotheca.db
//! ```
//!
//! ## Generated Data
//! - Branches named after city districts
//! - A catalog of over-the-counter and prescription-only products
//! - Stock for every product at every branch, varied per branch
//! - Payment methods come from the migrations

use apotheca_core::{Money, NewBranch, NewProduct};
use apotheca_db::{Database, DbConfig};
use std::env;

/// (name, category, manufacturer, price in VND, prescription only)
const CATALOG: &[(&str, &str, &str, i64, bool)] = &[
    ("Paracetamol 500mg", "Analgesic", "Hasan-Dermapharm", 15_000, false),
    ("Ibuprofen 400mg", "Analgesic", "Stada", 32_000, false),
    ("Aspirin 81mg", "Analgesic", "Bayer", 45_000, false),
    ("Cetirizine 10mg", "Antihistamine", "Domesco", 28_000, false),
    ("Loratadine 10mg", "Antihistamine", "Imexpharm", 30_000, false),
    ("Vitamin C 1000mg", "Supplement", "DHG Pharma", 65_000, false),
    ("Oral Rehydration Salts", "Supplement", "Pymepharco", 4_000, false),
    ("Omeprazole 20mg", "Gastrointestinal", "Stada", 48_000, false),
    ("Amoxicillin 500mg", "Antibiotic", "Imexpharm", 55_000, true),
    ("Azithromycin 250mg", "Antibiotic", "Pymepharco", 95_000, true),
    ("Ciprofloxacin 500mg", "Antibiotic", "Domesco", 72_000, true),
    ("Metformin 850mg", "Antidiabetic", "Merck", 60_000, true),
    ("Amlodipine 5mg", "Cardiovascular", "Pfizer", 85_000, true),
    ("Atorvastatin 20mg", "Cardiovascular", "Hasan-Dermapharm", 110_000, true),
    ("Salbutamol Inhaler", "Respiratory", "GSK", 78_000, true),
];

const BRANCHES: &[(&str, &str)] = &[
    ("Central", "1 Nguyen Hue, District 1"),
    ("Riverside", "48 Ton Duc Thang, District 1"),
    ("Tan Binh", "210 Cong Hoa, Tan Binh"),
    ("Thu Duc", "15 Vo Van Ngan, Thu Duc"),
    ("Binh Thanh", "92 Xo Viet Nghe Tinh, Binh Thanh"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut branch_count: usize = 1;
    let mut db_path = String::from("./apotheca_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--branches" | "-b" => {
                if i + 1 < args.len() {
                    branch_count = args[i + 1].parse().unwrap_or(1);
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
                println!("Apotheca Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -b, --branches <N>  Number of branches, 1-{} (default: 1)",
                    BRANCHES.len()
                );
                println!("  -d, --db <PATH>     Database file path (default: ./apotheca_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }
    let branch_count = branch_count.clamp(1, BRANCHES.len());

    println!("🌱 Apotheca Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Branches: {}", branch_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut branch_ids = Vec::with_capacity(branch_count);
    for (name, address) in &BRANCHES[..branch_count] {
        let branch = db
            .branches()
            .insert(&NewBranch {
                name: name.to_string(),
                address: Some(address.to_string()),
                phone: None,
            })
            .await?;
        branch_ids.push(branch.branch_id);
    }
    println!("✓ Created {} branches", branch_ids.len());

    let mut skus = 0;
    for (idx, (name, category, manufacturer, price, rx)) in CATALOG.iter().enumerate() {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: None,
                category: Some(category.to_string()),
                manufacturer: Some(manufacturer.to_string()),
                unit_price: Money::from_minor(*price),
                requires_prescription: *rx,
            })
            .await?;

        for (branch_idx, branch_id) in branch_ids.iter().enumerate() {
            let quantity = stock_level(idx, branch_idx);
            if let Err(e) = db.stock().add_sku(*branch_id, product.product_id, quantity).await {
                eprintln!("Failed to stock {} at branch {}: {}", name, branch_id, e);
                continue;
            }
            skus += 1;
        }
    }
    println!("✓ Created {} products, {} SKUs", CATALOG.len(), skus);

    let methods = db.payments().methods().await?;
    println!("✓ {} payment methods available", methods.len());

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

/// Deterministic stock level between 0 and 120, with some SKUs low on stock.
fn stock_level(product_idx: usize, branch_idx: usize) -> i64 {
    ((product_idx * 37 + branch_idx * 53) % 121) as i64
}

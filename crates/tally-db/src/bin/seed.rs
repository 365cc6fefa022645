//! # Seed Data Generator
//!
//! Populates a development database with products, customers and a few
//! sample bills so the back office has something to show.
//!
//! ## Usage
//! ```bash
//! # Default: 200 products into ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tally-db --bin seed -- --count 500 --db ./data/tally.db
//! ```

use chrono::Utc;
use std::env;
use uuid::Uuid;

use tally_core::{Actor, Customer, EntityState, PaymentMethod, Product, Role};
use tally_db::{CreateSaleRequest, Database, DbConfig, SaleLine};

/// Category and product names for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "beverages",
        &[
            "Green Tea 100g", "Black Tea 250g", "Instant Coffee 50g", "Orange Squash 1L",
            "Mango Juice 1L", "Apple Juice 1L", "Mineral Water 1.5L", "Cola 1.5L",
            "Lemon Soda 1.5L", "Energy Drink 250ml",
        ],
    ),
    (
        "grocery",
        &[
            "Basmati Rice 5kg", "Wheat Flour 10kg", "Sugar 1kg", "Salt 800g",
            "Cooking Oil 1L", "Red Lentils 1kg", "Chickpeas 1kg", "Spaghetti 400g",
            "Tomato Paste 400g", "Chilli Powder 200g",
        ],
    ),
    (
        "household",
        &[
            "Soap Bar", "Dishwash Liquid 500ml", "Laundry Powder 1kg", "Bleach 1L",
            "Sponge Pack", "Trash Bags 30pc", "Matches Box", "Candles 6pc",
            "Air Freshener", "Floor Cleaner 1L",
        ],
    ),
    (
        "snacks",
        &[
            "Potato Chips 60g", "Salted Peanuts 200g", "Chocolate Bar", "Biscuits 120g",
            "Rusk 300g", "Nimko Mix 200g", "Popcorn 100g", "Dates 500g",
            "Toffees Bag", "Cake Slice",
        ],
    ),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ayesha Khan", "0300-1112233"),
    ("Bilal Ahmed", "0321-4445566"),
    ("Fatima Raza", "0333-7778899"),
    ("Hassan Iqbal", "0345-1231234"),
    ("Sana Malik", "0301-9876543"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tally_dev.db");

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
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    println!();
    println!("Generating products...");

    let mut product_ids: Vec<(String, i64)> = Vec::new();
    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category, names) in CATEGORIES {
        for (idx, name) in names.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let product = generate_product(category, name, generated * 31 + idx);
            product_ids.push((product.id.clone(), product.price_cents));
            db.products().insert(&product).await?;
            generated += 1;
        }
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    // Customers
    let mut customer_ids = Vec::new();
    for (name, phone) in CUSTOMERS {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            email: String::new(),
            address: String::new(),
            total_orders: 0,
            total_spent_cents: 0,
            state: EntityState::Active,
            created_at: now,
            updated_at: now,
        };
        customer_ids.push(customer.id.clone());
        db.customers().insert(&customer).await?;
    }
    println!("✓ Generated {} customers", customer_ids.len());

    // A few sample sales through the engine, so movements and
    // aggregates look real
    let seed_actor = Actor::new("seed", Role::Admin);
    let engine = db.bill_engine();

    for (sale_idx, chunk) in product_ids.chunks(3).take(5).enumerate() {
        let items: Vec<SaleLine> = chunk
            .iter()
            .enumerate()
            .map(|(line_idx, (product_id, price_cents))| {
                let quantity = (line_idx as i64 % 3) + 1;
                SaleLine {
                    product_id: Some(product_id.clone()),
                    product_name: format!("Seed line {line_idx}"),
                    quantity,
                    unit_price_cents: *price_cents,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: quantity * price_cents,
                }
            })
            .collect();

        let subtotal: i64 = items.iter().map(|i| i.subtotal_cents).sum();
        let tax = subtotal / 10;

        let identity = engine
            .create_sale(
                &seed_actor,
                CreateSaleRequest {
                    customer_id: customer_ids.get(sale_idx).cloned(),
                    customer_name: None,
                    customer_phone: None,
                    customer_email: None,
                    customer_address: None,
                    items,
                    subtotal_cents: subtotal,
                    discount_cents: 0,
                    tax_cents: tax,
                    shipping_cents: 0,
                    total_cents: subtotal + tax,
                    payment_method: PaymentMethod::Cash,
                    payment_status: None,
                    paid_amount_cents: None,
                    notes: Some("seed data".to_string()),
                },
            )
            .await?;

        println!("  Sample sale {}", identity.bill_number);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with deterministic pseudo-random fields.
fn generate_product(category: &str, name: &str, seed: usize) -> Product {
    let now = Utc::now();

    // Price Rs 0.50 - Rs 850 in cents, spread by the seed
    let price_cents = 50 + ((seed * 173) % 85_000) as i64;
    let stock = (seed % 80) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        price_cents,
        stock,
        category: category.to_string(),
        state: EntityState::Active,
        created_at: now,
        updated_at: now,
    }
}

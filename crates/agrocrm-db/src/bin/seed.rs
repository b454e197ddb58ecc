//! # Seed Data Generator
//!
//! Populates the database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p agrocrm-db --bin seed
//!
//! # Custom product count / database path
//! cargo run -p agrocrm-db --bin seed -- --count 200 --db ./data/agrocrm.db
//! ```
//!
//! ## Generated Data
//! - One admin, two sellers, one technician
//! - A handful of clients spread across the sellers
//! - Products across agricultural categories (seeds, fertilizers,
//!   crop protection, foliar, equipment), most in calculated pricing
//!   mode so derived prices are visible immediately
//! - A default general commission rule (2% of gross)

use chrono::Utc;
use std::env;
use uuid::Uuid;

use agrocrm_core::pricing::derive_price;
use agrocrm_core::{
    Client, ClientStatus, CommissionBase, CommissionRule, Money, Percent, PricingMode, Product,
    Role, RuleScope, User, UserStatus, DEFAULT_TENANT_ID,
};
use agrocrm_db::{Database, DbConfig};

/// Product names per category for realistic demo data.
const CATALOG: &[(&str, &[&str])] = &[
    (
        "seeds",
        &[
            "Soybean seed 40kg",
            "Corn hybrid seed 60k",
            "Sorghum seed 20kg",
            "Wheat seed 40kg",
            "Sunflower seed 15kg",
            "Cotton seed 25kg",
        ],
    ),
    (
        "fertilizers",
        &[
            "NPK 20-05-20 25kg",
            "NPK 04-14-08 50kg",
            "Urea 50kg",
            "MAP 50kg",
            "Potassium chloride 50kg",
            "Limestone 1t",
        ],
    ),
    (
        "crop_protection",
        &[
            "Glyphosate 20L",
            "Atrazine 5L",
            "Mancozeb 10kg",
            "Lambda-cyhalothrin 1L",
            "Copper fungicide 5kg",
        ],
    ),
    (
        "foliar",
        &[
            "Boron foliar 5L",
            "Zinc foliar 5L",
            "Manganese foliar 5L",
            "Amino acid biostimulant 1L",
        ],
    ),
    (
        "equipment",
        &[
            "Backpack sprayer 20L",
            "Drone spraying kit",
            "Soil probe",
            "Moisture meter",
        ],
    ),
];

/// Margin/tax presets in basis points (margin, tax).
const RATE_PRESETS: &[(u32, u32)] = &[(2000, 1000), (2500, 1200), (1500, 800), (3000, 1000)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut db_path = String::from("./agrocrm_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
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
                println!("AgroCRM Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 100)");
                println!("  -d, --db <PATH>    Database file path (default: ./agrocrm_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 AgroCRM Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();

    // Users
    let users = [
        ("Rui Almeida", "rui@agro.example", Role::Admin),
        ("Ana Souza", "ana@agro.example", Role::Seller),
        ("Bia Ferreira", "bia@agro.example", Role::Seller),
        ("Tomás Lima", "tomas@agro.example", Role::Technician),
    ];
    let mut user_ids = Vec::new();
    for (name, email, role) in users {
        let id = Uuid::new_v4().to_string();
        db.users()
            .insert(&User {
                id: id.clone(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                role,
                status: UserStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await?;
        user_ids.push((id, role));
    }
    println!("✓ Seeded {} users", user_ids.len());

    // Clients, spread across the sellers
    let sellers: Vec<&String> = user_ids
        .iter()
        .filter(|(_, role)| *role == Role::Seller)
        .map(|(id, _)| id)
        .collect();
    let clients = [
        ("João Pereira", "Fazenda Boa Vista", "Rio Verde", "GO"),
        ("Marta Gomes", "Sítio São José", "Sorriso", "MT"),
        ("Carlos Dias", "Fazenda Santa Fé", "Uberaba", "MG"),
        ("Lúcia Prado", "Agropecuária Prado", "Cascavel", "PR"),
        ("Pedro Rocha", "Fazenda Três Irmãos", "Dourados", "MS"),
        ("Helena Cruz", "Sítio Primavera", "Barreiras", "BA"),
    ];
    for (idx, (name, farm, city, region)) in clients.iter().enumerate() {
        db.clients()
            .insert(&Client {
                id: Uuid::new_v4().to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                owner_user_id: sellers[idx % sellers.len()].clone(),
                name: name.to_string(),
                farm_name: Some(farm.to_string()),
                email: None,
                phone: None,
                city: Some(city.to_string()),
                region: Some(region.to_string()),
                status: if idx % 3 == 0 {
                    ClientStatus::Lead
                } else {
                    ClientStatus::Active
                },
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    println!("✓ Seeded {} clients", clients.len());

    // Products, round-robin over the catalog until count is reached
    let mut seeded = 0usize;
    'outer: loop {
        for (category, names) in CATALOG {
            for (n, name) in names.iter().enumerate() {
                if seeded >= count {
                    break 'outer;
                }

                let (margin_bps, tax_bps) = RATE_PRESETS[(seeded + n) % RATE_PRESETS.len()];
                // Spread costs between 30.00 and 1500.00
                let cost = Money::from_cents(3_000 + ((seeded * 7919) % 147) as i64 * 1_000);
                let price = derive_price(
                    cost,
                    Percent::from_bps(margin_bps),
                    Percent::from_bps(tax_bps),
                );

                let display_name = if seeded < names.len() * CATALOG.len() {
                    name.to_string()
                } else {
                    format!("{} (lot {})", name, seeded)
                };

                db.products()
                    .insert(&Product {
                        id: Uuid::new_v4().to_string(),
                        tenant_id: DEFAULT_TENANT_ID.to_string(),
                        name: display_name,
                        category: category.to_string(),
                        description: None,
                        cost_cents: cost.cents(),
                        price_cents: price.cents(),
                        pricing_mode: PricingMode::Calculated,
                        margin_bps,
                        tax_bps,
                        stock: 20 + ((seeded * 13) % 80) as i64,
                        low_stock_threshold: 5,
                        max_discount_bps: 1000,
                        is_active: true,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
                seeded += 1;
            }
        }
    }
    println!("✓ Seeded {} products", seeded);

    // Default commission rule: 2% of gross on any sale
    db.rules()
        .insert(&CommissionRule {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Default 2% gross".to_string(),
            base: CommissionBase::Gross,
            rate_bps: 200,
            scope: RuleScope::General,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("✓ Seeded default commission rule");

    println!();
    println!("Done.");
    Ok(())
}

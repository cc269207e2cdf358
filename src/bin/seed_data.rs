//! Seed data script - populates the database with a demo pharmacy
//!
//! Run with: cargo run --bin seed-data -- --migrate [--admin-password <password>]
//!
//! This creates:
//! - an admin account
//! - 2 branches
//! - 8 products, two of them prescription-only
//! - inventory for every product at every branch

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use pharmacy_api::{
    auth::{hash_password, password_policy::PasswordPolicy},
    db,
    entities::{branch, inventory, product, user_account, UserRole},
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Populate the pharmacy database with demo data")]
struct Args {
    /// Database URL (falls back to DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Email of the admin account to create
    #[arg(long, default_value = "admin@pharmacy.local")]
    admin_email: String,

    /// Password of the admin account; a random one is generated and printed when omitted
    #[arg(long)]
    admin_password: Option<String>,

    /// Run migrations before seeding
    #[arg(long)]
    migrate: bool,
}

const PRODUCTS: &[(&str, &str, &str, &str, Decimal, bool)] = &[
    ("PAR-500", "Paracetamol 500mg", "pain-relief", "Acme Pharma", dec!(4.25), false),
    ("IBU-200", "Ibuprofen 200mg", "pain-relief", "Acme Pharma", dec!(5.50), false),
    ("LOR-10", "Loratadine 10mg", "allergy", "Northwind Labs", dec!(7.90), false),
    ("VIT-C1000", "Vitamin C 1000mg", "vitamins", "Sunvale", dec!(9.99), false),
    ("ORS-SACH", "Oral Rehydration Salts", "digestive", "Northwind Labs", dec!(3.20), false),
    ("SPF-50", "Sunscreen SPF 50", "skin-care", "Sunvale", dec!(14.00), false),
    ("AMX-500", "Amoxicillin 500mg", "antibiotics", "Helix Generics", dec!(12.50), true),
    ("ATV-20", "Atorvastatin 20mg", "cardiovascular", "Helix Generics", dec!(18.75), true),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    info!("=== Pharmacy API Seed Data ===");

    let database_url = args
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://pharmacy.db?mode=rwc".to_string());

    let policy = PasswordPolicy::default();
    let admin_password = match args.admin_password.clone() {
        Some(password) => password,
        None => {
            let generated = policy.generate_secure_password();
            info!("Generated admin password: {}", generated);
            generated
        }
    };
    policy
        .validate(&admin_password, Some(&args.admin_email))
        .map_err(|e| anyhow::anyhow!("admin password rejected: {}", e))?;

    info!("Connecting to database: {}", database_url);
    let pool = db::establish_connection(&database_url)
        .await
        .context("failed to connect to database")?;
    if args.migrate {
        db::run_migrations(&pool)
            .await
            .context("failed running migrations")?;
    }

    info!("Creating admin account...");
    create_admin(&pool, &args.admin_email, &admin_password).await?;

    info!("Creating branches...");
    let branches = create_branches(&pool).await?;
    info!("  Created {} branches", branches.len());

    info!("Creating products...");
    let products = create_products(&pool).await?;
    info!("  Created {} products", products.len());

    info!("Creating inventory...");
    let inventory_count = create_inventory(&pool, &branches, &products).await?;
    info!("  Created {} inventory rows", inventory_count);

    info!("=== Seed Data Complete ===");
    info!("Try these API calls:");
    info!("  curl http://localhost:8080/api/branches");
    info!("  curl http://localhost:8080/api/products");
    info!("  curl http://localhost:8080/api/products/categories");

    db::close_pool(pool).await?;
    Ok(())
}

async fn create_admin(db: &DatabaseConnection, email: &str, password: &str) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    let existing = user_account::Entity::find()
        .filter(user_account::Column::Email.eq(email.clone()))
        .one(db)
        .await?;
    if existing.is_some() {
        info!("  Admin {} already exists, skipping", email);
        return Ok(());
    }

    let now = Utc::now();
    user_account::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        password_hash: Set(hash_password(password)?),
        role: Set(UserRole::Admin),
        is_active: Set(true),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!("  Created admin {}", email);
    Ok(())
}

async fn create_branches(db: &DatabaseConnection) -> anyhow::Result<Vec<branch::Model>> {
    let now = Utc::now();
    let mut created = Vec::new();
    for (name, address, phone) in [
        ("Central Pharmacy", "1 Market Square", "+1-555-0100"),
        ("Riverside Pharmacy", "48 River Road", "+1-555-0148"),
    ] {
        let model = branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            address: Set(address.to_string()),
            phone: Set(Some(phone.to_string())),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        created.push(model);
    }
    Ok(created)
}

async fn create_products(db: &DatabaseConnection) -> anyhow::Result<Vec<product::Model>> {
    let now = Utc::now();
    let mut created = Vec::new();
    for (sku, name, category, manufacturer, price, requires_prescription) in PRODUCTS {
        let exists = product::Entity::find()
            .filter(product::Column::Sku.eq(*sku))
            .one(db)
            .await?;
        if let Some(existing) = exists {
            created.push(existing);
            continue;
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            description: Set(None),
            category: Set(category.to_string()),
            manufacturer: Set(Some(manufacturer.to_string())),
            price: Set(*price),
            requires_prescription: Set(*requires_prescription),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        created.push(model);
    }
    Ok(created)
}

async fn create_inventory(
    db: &DatabaseConnection,
    branches: &[branch::Model],
    products: &[product::Model],
) -> anyhow::Result<usize> {
    let now = Utc::now();
    let mut count = 0;
    for (b, branch) in branches.iter().enumerate() {
        for (p, product) in products.iter().enumerate() {
            // Spread stock so the low-stock report has something to show
            let quantity = ((b * 7 + p * 13) % 60) as i32;
            inventory::ActiveModel {
                id: Set(Uuid::new_v4()),
                branch_id: Set(branch.id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                reorder_level: Set(10),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
            count += 1;
        }
    }
    Ok(count)
}

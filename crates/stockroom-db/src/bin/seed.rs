//! # Seed Data Generator
//!
//! Populates a store with demo items, restocks and sales for development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured store with every demo item
//! cargo run -p stockroom-db --bin seed
//!
//! # Limit the number of items
//! cargo run -p stockroom-db --bin seed -- --count 20
//!
//! # Specify database path or config file
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! cargo run -p stockroom-db --bin seed -- --config ./stockroom.toml
//! ```
//!
//! After seeding it prints the revenue, shelf age and low stock reports
//! as JSON.

use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stockroom_core::{Actor, CheckoutLine, Item, Money, NewItem, NewUser};
use stockroom_db::{Database, StoreConfig};

/// Demo catalog: (code prefix, [(name, price cents, cost cents)]).
const CATEGORIES: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "DRY",
        &[
            ("Whole Milk", 249, 180),
            ("Cheddar Cheese", 499, 320),
            ("Greek Yogurt", 129, 70),
            ("Butter", 389, 260),
            ("Eggs Dozen", 329, 210),
        ],
    ),
    (
        "BAK",
        &[
            ("White Bread", 279, 120),
            ("Bagels", 349, 150),
            ("Croissant", 199, 80),
        ],
    ),
    (
        "GRO",
        &[
            ("Rice White", 599, 380),
            ("Pasta Penne", 189, 90),
            ("Canned Beans", 119, 60),
            ("Peanut Butter", 449, 300),
            ("Flour", 399, 250),
            ("Salt", 99, 30),
        ],
    ),
    (
        "BEV",
        &[
            ("Orange Juice", 399, 240),
            ("Sparkling Water", 149, 50),
            ("Coffee Beans", 1299, 800),
        ],
    ),
];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        count: usize::MAX,
        db_path: None,
        config_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.count = value.parse().unwrap_or(usize::MAX);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.db_path = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--config" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.config_path = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of demo items to create (default: all)");
                println!("  -d, --db <PATH>     Database file path (overrides config)");
                println!("      --config <PATH> Config file (default: platform config dir)");
                println!("  -h, --help          Show this help message");
                return None;
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(args) = parse_args() else {
        return Ok(());
    };

    let mut config = StoreConfig::load(args.config_path)?;
    if let Some(path) = args.db_path {
        config.database.path = Some(path);
    }

    let db_config = config.db_config()?;
    info!(path = %db_config.database_path.display(), "Opening store");

    if let Some(parent) = db_config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(db_config).await?;
    let root = db
        .users()
        .ensure_root_admin(&config.root_admin.username, &config.root_admin.password)
        .await?;

    let existing = db.items().count().await?;
    if existing > 0 {
        warn!(existing, "Store already has items, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut items: Vec<Item> = Vec::new();

    'outer: for (prefix, entries) in CATEGORIES {
        for (idx, (name, price, cost)) in entries.iter().enumerate() {
            if items.len() >= args.count {
                break 'outer;
            }

            let seed = items.len();
            let new = NewItem {
                name: name.to_string(),
                code: format!("{}-{:03}", prefix, idx + 1),
                description: None,
                price: Money::from_cents(*price),
                cost: Money::from_cents(*cost),
                quantity: (seed as i64 * 7) % 25,
            };

            match db.items().create(&new).await {
                Ok(item) => items.push(item),
                Err(e) => warn!(code = %new.code, error = %e, "Failed to create item"),
            }
        }
    }

    info!(count = items.len(), "Items created");

    // Perishables get a batch with an expiry date.
    let today = Utc::now().date_naive();
    for (seed, item) in items.iter().enumerate() {
        let expiry = item
            .code
            .starts_with("DRY")
            .then(|| today + Duration::days(7 + seed as i64));

        db.batches().restock(&item.id, 12, expiry).await?;
    }

    let cashier = match db.users().get_by_username("cashier").await {
        Ok(user) => user,
        Err(_) => {
            db.users()
                .create(&NewUser {
                    username: "cashier".to_string(),
                    password: "cashier".to_string(),
                    can_read: true,
                    can_transact: true,
                    can_view_revenue: false,
                })
                .await?
        }
    };
    let cashier = Actor::from(&cashier);

    let mut sales = 0;
    for chunk in items.chunks(3) {
        let lines: Vec<CheckoutLine> = chunk
            .iter()
            .enumerate()
            .map(|(n, item)| CheckoutLine::new(&item.id, n as i64 + 1, item.price()))
            .collect();

        let seller = if sales % 2 == 0 { &cashier.id } else { &root.id };
        db.transactions().checkout(seller, &lines).await?;
        sales += 1;
    }

    info!(sales, elapsed = ?start.elapsed(), "Seed complete");

    let reports = db.reports();
    let summary = serde_json::json!({
        "revenue_by_item": reports.revenue_by_item().await?,
        "oldest_on_shelf": reports.oldest_on_shelf().await?,
        "low_stock": reports.low_stock(config.ledger.low_stock_threshold).await?,
        "recent_transactions": db.transactions().list_recent(config.ledger.recent_limit).await?.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}

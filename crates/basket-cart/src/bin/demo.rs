//! # Basket Demo
//!
//! Runs a scripted shopping session against an in-process server.
//!
//! ## Usage
//! ```bash
//! # Readiness-settled login, in-memory local cart
//! cargo run -p basket-cart --bin basket-demo
//!
//! # Use a config file (settle mode, local snapshot)
//! cargo run -p basket-cart --bin basket-demo -- --config ./basket.toml
//!
//! # More logging
//! RUST_LOG=debug cargo run -p basket-cart --bin basket-demo
//! ```
//!
//! ## Script
//! 1. Anonymous user adds two products
//! 2. User logs in; the local cart is merged into the remote cart
//! 3. User adds one more line against the remote cart
//! 4. User logs out; the cart is local (and empty) again

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use basket_cart::{
    AuthEvent, CartConfig, CartEventEmitter, CartManager, ClientCartManager, ServerCartManager,
    SettleStrategy,
};
use basket_core::{AmountSource, CollectionKind, Money, NewCartItem, StaticProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Prints cart notifications as they happen.
struct ConsoleEmitter;

impl CartEventEmitter for ConsoleEmitter {
    fn emit_active_changed(&self, kind: CollectionKind) {
        println!("  ↳ active cart is now {}", kind);
    }

    fn emit_merged(&self, owner_id: &str, count: usize) {
        println!("  ↳ merged {} line(s) into {}'s cart", count, owner_id);
    }

    fn emit_error(&self, message: &str) {
        println!("  ↳ error: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Basket Demo");
                println!();
                println!("Usage: basket-demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Cart config file (default: in-memory cart)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => CartConfig::load(Some(path))?,
        None => CartConfig::ephemeral(),
    };

    println!("Basket Demo");
    println!("===========");
    println!("Settle: {}", config.session.settle);
    println!();

    // Server and pricing
    let server = ServerCartManager::new();
    let catalog = StaticProvider::new()
        .with("p1", AmountSource::fixed(Money::from_cents(1099)))
        .with("p2", AmountSource::fixed(Money::from_cents(250)))
        .with("p3", AmountSource::computed(|| Money::from_cents(1999 - 500)));

    let client = ClientCartManager::builder(server.connector())
        .with_local(match config.local_snapshot() {
            Some(snapshot) => basket_store::LocalCollection::open(snapshot)?,
            None => basket_store::LocalCollection::in_memory(),
        })
        .with_settle(config.settle_strategy())
        .with_emitter(Arc::new(ConsoleEmitter))
        .build()?;
    client.configure([("product".to_string(), catalog.into_shared())]);

    // 1. Anonymous shopping
    println!("1. Shopping anonymously");
    client.add(NewCartItem::new("product", "p1", 1))?;
    client.add(NewCartItem::new("product", "p2", 2))?;
    client.add(NewCartItem::new("product", "p2", 1))?;
    print_cart(&*client)?;

    // 2. Login
    println!("2. Logging in as alice");
    let session = client.spawn_session(8);
    session
        .send(AuthEvent::LoggedIn {
            owner_id: "alice".into(),
        })
        .await?;

    match client.settle_strategy() {
        SettleStrategy::Readiness => session.send(AuthEvent::Settled).await?,
        SettleStrategy::Delay(delay) => tokio::time::sleep(delay * 2).await,
    }
    wait_for(&client, CollectionKind::Remote).await;
    print_cart(&*client)?;

    // 3. Authenticated shopping
    println!("3. Shopping as alice");
    client.add(NewCartItem::new("product", "p3", 1))?;
    print_cart(&*client)?;
    let remote_lines = server.cart_for("alice").items().count()?;
    info!(remote_lines, "Server view of alice's cart");

    // 4. Logout
    println!("4. Logging out");
    session.send(AuthEvent::LoggedOut).await?;
    wait_for(&client, CollectionKind::Local).await;
    print_cart(&*client)?;

    session.shutdown().await;
    Ok(())
}

fn print_cart(cart: &dyn CartManager) -> Result<(), Box<dyn std::error::Error>> {
    for item in cart.items().iter()? {
        println!(
            "   {:>3} × {}/{}",
            item.quantity, item.relation_type, item.relation_id
        );
    }
    println!(
        "   {} item(s), total {}",
        cart.num_items()?,
        cart.amount()?
    );
    println!();
    Ok(())
}

async fn wait_for(client: &ClientCartManager, kind: CollectionKind) {
    let mut rx = client.active_slot().watch();
    while rx.borrow_and_update().kind != kind {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,basket=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

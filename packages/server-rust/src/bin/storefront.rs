//! Runs a scripted storefront session through the dispatcher and logs each
//! outcome as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;
use storefront_core::{ErrorResult, Identity};
use storefront_server::service::domain::{
    self, catalog::ADMIN_ROLE, AddCartItem, CreateProduct, GetCart, GetProduct, GetProducts,
};
use storefront_server::storage::MemoryStore;
use storefront_server::telemetry::{init_tracing, LogFormat};
use storefront_server::{
    CallContext, CartStore, CatalogBuilder, CatalogStore, Dispatcher, PipelineConfig, TracingSink,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Drive the storefront request pipeline")]
struct Args {
    /// Handler latency in milliseconds above which a warning is logged.
    #[arg(long, env = "STOREFRONT_SLOW_REQUEST_MS", default_value_t = 500)]
    slow_request_ms: u64,

    #[arg(long, env = "STOREFRONT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Number of demo products created before the session starts.
    #[arg(long, env = "STOREFRONT_SEED_PRODUCTS", default_value_t = 25)]
    seed_products: u32,
}

fn report<T: Serialize>(step: &str, outcome: &Result<T, ErrorResult>) -> anyhow::Result<()> {
    let body = match outcome {
        Ok(value) => serde_json::to_string(value)?,
        Err(error) => serde_json::to_string(error)?,
    };
    tracing::info!(step, ok = outcome.is_ok(), body = %body, "step finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let store = Arc::new(MemoryStore::new());
    let catalog_store: Arc<dyn CatalogStore> = store.clone();
    let cart_store: Arc<dyn CartStore> = store.clone();

    let catalog = domain::register(CatalogBuilder::new(), &catalog_store, &cart_store)
        .build()
        .context("invalid request bindings")?;
    let config = PipelineConfig {
        slow_request_threshold: Duration::from_millis(args.slow_request_ms),
    };
    let dispatcher = Dispatcher::new(catalog, &config, Arc::new(TracingSink));

    let admin = Identity::user("admin-1", [ADMIN_ROLE]);
    let customer = Identity::user("customer-1", ["Customer"]);

    for n in 1..=args.seed_products {
        let request = CreateProduct {
            name: format!("  Product {n:03} "),
            description: Some("   ".to_string()),
            price_cents: u64::from(n) * 100,
            tags: vec!["demo".to_string()],
        };
        dispatcher
            .dispatch(request, CallContext::new(admin.clone()))
            .await
            .map_err(|e| anyhow::anyhow!("seeding failed: {e}"))?;
    }
    tracing::info!(products = store.product_count(), "catalog seeded");

    let page = dispatcher
        .dispatch(
            GetProducts {
                page_number: 2,
                page_size: 10,
                search: None,
            },
            CallContext::new(Identity::anonymous()),
        )
        .await;
    report("list page 2", &page)?;

    let first_id = page
        .as_ref()
        .ok()
        .and_then(|p| p.items().first().map(|s| s.id))
        .unwrap_or_else(Uuid::nil);

    let outcome = dispatcher
        .dispatch(GetProduct { id: Uuid::new_v4() }, CallContext::new(Identity::anonymous()))
        .await;
    report("get missing product", &outcome)?;

    let outcome = dispatcher
        .dispatch(
            AddCartItem {
                product_id: first_id,
                quantity: 1,
                note: None,
            },
            CallContext::new(Identity::anonymous()),
        )
        .await;
    report("anonymous add to cart", &outcome)?;

    let outcome = dispatcher
        .dispatch(
            AddCartItem {
                product_id: first_id,
                quantity: 0,
                note: None,
            },
            CallContext::new(customer.clone()),
        )
        .await;
    report("add zero quantity", &outcome)?;

    let outcome = dispatcher
        .dispatch(
            AddCartItem {
                product_id: first_id,
                quantity: 2,
                note: Some("  gift wrap ".to_string()),
            },
            CallContext::new(customer.clone()),
        )
        .await;
    report("add to cart", &outcome)?;

    let outcome = dispatcher
        .dispatch(GetCart, CallContext::new(customer.clone()))
        .await;
    report("get cart", &outcome)?;

    let outcome = dispatcher
        .dispatch(
            CreateProduct {
                name: "Contraband".to_string(),
                description: None,
                price_cents: 1,
                tags: Vec::new(),
            },
            CallContext::new(customer),
        )
        .await;
    report("customer creates product", &outcome)?;

    Ok(())
}

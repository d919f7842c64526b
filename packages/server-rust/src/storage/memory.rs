//! In-memory [`CatalogStore`] and [`CartStore`] implementation.
//!
//! Products live in a `BTreeMap` behind a `parking_lot::RwLock`; carts are
//! sharded per user in a [`DashMap`]. All data is lost on drop.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use storefront_core::VecQuery;
use uuid::Uuid;

use crate::storage::record::{Cart, CartLine, Product};
use crate::traits::{CartStore, CatalogStore, InsertOutcome, ProductQuery};

/// Memory-backed storage for products and carts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<Uuid, Product>>,
    carts: DashMap<String, Cart>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.read().len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().get(&id).cloned())
    }

    async fn insert_product(&self, product: Product) -> anyhow::Result<InsertOutcome> {
        // Name check and insert happen under one write guard.
        let mut products = self.products.write();
        if products.contains_key(&product.id) {
            anyhow::bail!("product id {} already stored", product.id);
        }
        if let Some(existing) = products.values().find(|p| p.name == product.name) {
            return Ok(InsertOutcome::NameTaken(existing.clone()));
        }
        products.insert(product.id, product);
        Ok(InsertOutcome::Inserted)
    }

    async fn products(&self, search: Option<&str>) -> anyhow::Result<ProductQuery> {
        let mut snapshot: Vec<Product> = self.products.read().values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let query = VecQuery::new(snapshot);
        let query: ProductQuery = match search.map(str::to_lowercase) {
            Some(needle) => {
                Box::new(query.filter(move |p: &Product| p.name.to_lowercase().contains(&needle)))
            }
            None => Box::new(query),
        };
        Ok(query)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart(&self, user_id: &str) -> anyhow::Result<Cart> {
        Ok(self
            .carts
            .get(user_id)
            .map_or_else(|| Cart::empty(user_id), |cart| cart.value().clone()))
    }

    async fn add_line(&self, user_id: &str, line: CartLine) -> anyhow::Result<Cart> {
        let mut cart = self
            .carts
            .entry(user_id.to_string())
            .or_insert_with(|| Cart::empty(user_id));
        cart.add(line);
        Ok(cart.clone())
    }
}

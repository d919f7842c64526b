use async_trait::async_trait;
use storefront_core::OrderedQuery;
use uuid::Uuid;

use crate::storage::record::{Cart, CartLine, Product};

/// Boxed catalog query paged by `storefront_core::paginate`.
pub type ProductQuery = Box<dyn OrderedQuery<Item = Product>>;

/// Result of [`CatalogStore::insert_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another product already holds the name; nothing was stored.
    NameTaken(Product),
}

/// Product catalog persistence.
/// Implementations: memory (tests and the demo binary).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load a single product by id.
    async fn product(&self, id: Uuid) -> anyhow::Result<Option<Product>>;

    /// Insert a new product. Ids are assigned by the caller.
    ///
    /// Names are unique. The name check and the insert must be one atomic
    /// step: of two concurrent inserts with the same name exactly one is
    /// stored and the other gets [`InsertOutcome::NameTaken`]. A duplicate id
    /// is an error.
    async fn insert_product(&self, product: Product) -> anyhow::Result<InsertOutcome>;

    /// Products ordered by name then id, optionally restricted to names
    /// containing `search` (case-insensitive).
    async fn products(&self, search: Option<&str>) -> anyhow::Result<ProductQuery>;
}

/// Per-user cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart; empty when nothing was added yet.
    async fn cart(&self, user_id: &str) -> anyhow::Result<Cart>;

    /// Add a line to the user's cart and return the updated cart.
    async fn add_line(&self, user_id: &str, line: CartLine) -> anyhow::Result<Cart>;
}

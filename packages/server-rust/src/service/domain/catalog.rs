//! Catalog requests: browsing and maintaining products.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storefront_core::{
    impl_sanitize, paginate, AccessPolicy, ErrorCode, ErrorResult, PageRequest, PaginatedList,
    Request, RuleSet,
};
use uuid::Uuid;

use super::pagination_error;
use crate::service::catalog::CatalogBuilder;
use crate::service::operation::{CallContext, OperationError};
use crate::service::router::Handler;
use crate::storage::record::Product;
use crate::traits::{CatalogStore, InsertOutcome};

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const ADMIN_ROLE: &str = "Admin";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One page of products, optionally filtered by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProducts {
    pub page_number: u32,
    pub page_size: u32,
    #[serde(default)]
    pub search: Option<String>,
}

impl_sanitize!(GetProducts { search });

impl Request for GetProducts {
    type Response = PaginatedList<ProductSummary>;
    const NAME: &'static str = "GetProducts";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProduct {
    pub id: Uuid,
}

impl_sanitize!(GetProduct { id });

impl Request for GetProduct {
    type Response = Product;
    const NAME: &'static str = "GetProduct";
}

/// Adds a product to the catalog. Names are unique.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl_sanitize!(CreateProduct {
    name,
    description,
    tags
});

impl Request for CreateProduct {
    type Response = Product;
    const NAME: &'static str = "CreateProduct";
}

/// List entry returned by [`GetProducts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u64,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price_cents: product.price_cents,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn get_products_rules() -> RuleSet<GetProducts> {
    RuleSet::new()
        .field("PageNumber", |r: &GetProducts| &r.page_number, |f| {
            f.greater_than_or_equal(1)
        })
        .field("PageSize", |r: &GetProducts| &r.page_size, |f| {
            f.greater_than_or_equal(1).less_than_or_equal(MAX_PAGE_SIZE)
        })
        .field("Search", |r: &GetProducts| &r.search, |f| f.max_length(100))
}

fn get_product_rules() -> RuleSet<GetProduct> {
    RuleSet::new().field("Id", |r: &GetProduct| &r.id, |f| f.not_empty())
}

fn create_product_rules() -> RuleSet<CreateProduct> {
    RuleSet::new()
        .field("Name", |r: &CreateProduct| &r.name, |f| {
            f.not_empty().max_length(120).stop_on_first_failure()
        })
        .field("Description", |r: &CreateProduct| &r.description, |f| {
            f.max_length(2000)
        })
        .field("PriceCents", |r: &CreateProduct| &r.price_cents, |f| {
            f.greater_than(0)
        })
        .field("Tags", |r: &CreateProduct| &r.tags, |f| {
            f.must(|tags: &Vec<String>| tags.len() <= 10, "'Tags' must contain at most 10 items.")
                .must(
                    |tags: &Vec<String>| tags.iter().all(|t| !t.is_empty()),
                    "'Tags' must not contain empty values.",
                )
        })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub struct GetProductsHandler {
    store: Arc<dyn CatalogStore>,
}

#[async_trait]
impl Handler<GetProducts> for GetProductsHandler {
    async fn handle(
        &self,
        request: GetProducts,
        _ctx: &CallContext,
    ) -> Result<PaginatedList<ProductSummary>, OperationError> {
        let page = PageRequest::new(request.page_number, request.page_size).map_err(pagination_error)?;
        let query = self.store.products(request.search.as_deref()).await?;
        let products = paginate(&*query, page).await.map_err(pagination_error)?;
        Ok(products.map(ProductSummary::from))
    }
}

pub struct GetProductHandler {
    store: Arc<dyn CatalogStore>,
}

#[async_trait]
impl Handler<GetProduct> for GetProductHandler {
    async fn handle(&self, request: GetProduct, _ctx: &CallContext) -> Result<Product, OperationError> {
        match self.store.product(request.id).await? {
            Some(product) => Ok(product),
            None => Err(ErrorResult::with_message(
                ErrorCode::NotFound,
                format!("Product {} was not found.", request.id),
            )
            .into()),
        }
    }
}

pub struct CreateProductHandler {
    store: Arc<dyn CatalogStore>,
}

#[async_trait]
impl Handler<CreateProduct> for CreateProductHandler {
    async fn handle(&self, request: CreateProduct, ctx: &CallContext) -> Result<Product, OperationError> {
        let product = Product {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            price_cents: request.price_cents,
            tags: request.tags,
        };
        match self.store.insert_product(product.clone()).await? {
            InsertOutcome::Inserted => {
                tracing::info!(product_id = %product.id, caller = ctx.caller(), "product created");
                Ok(product)
            }
            InsertOutcome::NameTaken(existing) => Err(ErrorResult::with_custom_data(
                ErrorCode::Conflict,
                json!({ "name": existing.name, "existingId": existing.id }),
            )
            .into()),
        }
    }
}

/// Binds every catalog request to its handler, policy, and rules.
pub fn register(builder: CatalogBuilder, store: &Arc<dyn CatalogStore>) -> CatalogBuilder {
    builder
        .handle(GetProductsHandler {
            store: Arc::clone(store),
        })
        .validate(get_products_rules())
        .handle(GetProductHandler {
            store: Arc::clone(store),
        })
        .validate(get_product_rules())
        .handle(CreateProductHandler {
            store: Arc::clone(store),
        })
        .authorize::<CreateProduct>(AccessPolicy::roles([ADMIN_ROLE]))
        .validate(create_product_rules())
}

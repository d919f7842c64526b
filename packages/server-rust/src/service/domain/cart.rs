//! Cart requests. Every cart belongs to the authenticated caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::{impl_sanitize, AccessPolicy, ErrorCode, ErrorResult, Request, RuleSet};
use uuid::Uuid;

use crate::service::catalog::CatalogBuilder;
use crate::service::operation::{CallContext, OperationError};
use crate::service::router::Handler;
use crate::storage::record::{Cart, CartLine};
use crate::traits::{CartStore, CatalogStore};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub note: Option<String>,
}

impl_sanitize!(AddCartItem {
    product_id,
    quantity,
    note
});

impl Request for AddCartItem {
    type Response = CartView;
    const NAME: &'static str = "AddCartItem";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetCart;

impl_sanitize!(GetCart {});

impl Request for GetCart {
    type Response = CartView;
    const NAME: &'static str = "GetCart";
}

/// Cart as returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub item_count: u64,
    pub total_cents: u64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self {
            item_count: cart.lines.iter().map(|l| u64::from(l.quantity)).sum(),
            total_cents: cart.total_cents(),
            lines: cart.lines,
        }
    }
}

fn add_cart_item_rules() -> RuleSet<AddCartItem> {
    RuleSet::new()
        .field("ProductId", |r: &AddCartItem| &r.product_id, |f| f.not_empty())
        .field("Quantity", |r: &AddCartItem| &r.quantity, |f| {
            f.greater_than(0).less_than_or_equal(999)
        })
        .field("Note", |r: &AddCartItem| &r.note, |f| f.max_length(250))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// The authorization stage guarantees a user id; a missing one here is a
/// wiring bug, not a client error.
fn owner(ctx: &CallContext) -> anyhow::Result<&str> {
    ctx.identity
        .user_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("cart request reached its handler without a user id"))
}

pub struct AddCartItemHandler {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
}

#[async_trait]
impl Handler<AddCartItem> for AddCartItemHandler {
    async fn handle(&self, request: AddCartItem, ctx: &CallContext) -> Result<CartView, OperationError> {
        let user_id = owner(ctx)?;
        let Some(product) = self.catalog.product(request.product_id).await? else {
            return Err(ErrorResult::with_message(
                ErrorCode::NotFound,
                format!("Product {} was not found.", request.product_id),
            )
            .into());
        };

        let quantity = u32::try_from(request.quantity).map_err(anyhow::Error::from)?;
        let line = CartLine {
            product_id: product.id,
            quantity,
            unit_price_cents: product.price_cents,
            note: request.note,
        };
        let cart = self.carts.add_line(user_id, line).await?;
        tracing::debug!(user_id, product_id = %product.id, quantity, "cart line added");
        Ok(cart.into())
    }
}

pub struct GetCartHandler {
    carts: Arc<dyn CartStore>,
}

#[async_trait]
impl Handler<GetCart> for GetCartHandler {
    async fn handle(&self, _request: GetCart, ctx: &CallContext) -> Result<CartView, OperationError> {
        let user_id = owner(ctx)?;
        Ok(self.carts.cart(user_id).await?.into())
    }
}

/// Binds every cart request to its handler, policy, and rules.
pub fn register(
    builder: CatalogBuilder,
    catalog: &Arc<dyn CatalogStore>,
    carts: &Arc<dyn CartStore>,
) -> CatalogBuilder {
    builder
        .handle(AddCartItemHandler {
            catalog: Arc::clone(catalog),
            carts: Arc::clone(carts),
        })
        .authorize::<AddCartItem>(AccessPolicy::Authenticated)
        .validate(add_cart_item_rules())
        .handle(GetCartHandler {
            carts: Arc::clone(carts),
        })
        .authorize::<GetCart>(AccessPolicy::Authenticated)
}

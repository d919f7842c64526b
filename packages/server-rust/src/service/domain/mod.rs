//! Storefront requests and their handlers.
//!
//! - [`catalog`]: `GetProducts`, `GetProduct`, `CreateProduct`
//! - [`cart`]: `AddCartItem`, `GetCart`

pub mod cart;
pub mod catalog;

use std::sync::Arc;

use storefront_core::{ErrorResult, PaginationError, ValidationFailure};

use crate::service::catalog::CatalogBuilder;
use crate::service::operation::OperationError;
use crate::traits::{CartStore, CatalogStore};

pub use cart::{AddCartItem, CartView, GetCart};
pub use catalog::{CreateProduct, GetProduct, GetProducts, ProductSummary};

/// Registers every storefront request on `builder`.
pub fn register(
    builder: CatalogBuilder,
    catalog: &Arc<dyn CatalogStore>,
    carts: &Arc<dyn CartStore>,
) -> CatalogBuilder {
    let builder = catalog::register(builder, catalog);
    cart::register(builder, catalog, carts)
}

/// Out-of-range page coordinates are the client's fault; query failures are not.
pub(crate) fn pagination_error(err: PaginationError) -> OperationError {
    match err {
        PaginationError::InvalidArgument { name, value } => {
            let field = match name {
                "page_number" => "PageNumber",
                "page_size" => "PageSize",
                other => other,
            };
            let message = format!("'{field}' must be at least 1, got {value}.");
            match ErrorResult::from_validation_failures(vec![ValidationFailure::new(field, message)]) {
                Some(error) => OperationError::Rejected(error),
                None => OperationError::Internal(anyhow::anyhow!("{field} rejected")),
            }
        }
        PaginationError::Query(e) => OperationError::Internal(e),
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::{ErrorCode, PageRequest};

    use super::*;

    #[test]
    fn invalid_page_becomes_validation_error() {
        let err = PageRequest::new(0, 10).unwrap_err();
        let OperationError::Rejected(error) = pagination_error(err) else {
            panic!("expected rejection");
        };
        assert!(error.has_code(ErrorCode::InvalidModel.as_str()));
        assert!(error.validation_errors().contains_key("PageNumber"));
    }

    #[test]
    fn query_failure_stays_internal() {
        let err = PaginationError::Query(anyhow::anyhow!("disk on fire"));
        assert!(matches!(pagination_error(err), OperationError::Internal(_)));
    }
}

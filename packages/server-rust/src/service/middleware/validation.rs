//! Runs the rule set bound for the request type and rejects with
//! `COMMON_INVALID_MODEL` when any rule fails.

use std::sync::Arc;
use std::task::{Context, Poll};

use storefront_core::ErrorResult;
use tower::{Layer, Service};

use crate::service::catalog::RequestCatalog;
use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};

#[derive(Debug, Clone)]
pub struct ValidationLayer {
    catalog: Arc<RequestCatalog>,
}

impl ValidationLayer {
    #[must_use]
    pub fn new(catalog: Arc<RequestCatalog>) -> Self {
        Self { catalog }
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            catalog: Arc::clone(&self.catalog),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
    catalog: Arc<RequestCatalog>,
}

impl<S> Service<Operation> for ValidationService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        if let Err(e) = op.ctx().ensure_active() {
            return Box::pin(async move { Err(e) });
        }

        let failures = self
            .catalog
            .validate(op.request_type(), op.request().as_any());
        if let Some(error) = ErrorResult::from_validation_failures(failures) {
            tracing::debug!(
                request = op.name(),
                call_id = op.ctx().call_id,
                fields = ?error.validation_errors().keys().collect::<Vec<_>>(),
                "request rejected by validation"
            );
            return Box::pin(async move { Err(error.into()) });
        }
        Box::pin(self.inner.call(op))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_core::{impl_sanitize, ErrorCode, Identity, Request, RuleSet};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::service::catalog::CatalogBuilder;
    use crate::service::operation::CallContext;
    use crate::service::router::{Handler, HandlerRouter};

    struct AddLine {
        product_id: Uuid,
        quantity: i32,
    }
    impl_sanitize!(AddLine { product_id, quantity });
    impl Request for AddLine {
        type Response = ();
        const NAME: &'static str = "AddLine";
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler<AddLine> for Counting {
        async fn handle(&self, _request: AddLine, _ctx: &CallContext) -> Result<(), OperationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(calls: &Counting) -> ValidationService<HandlerRouter> {
        let rules = RuleSet::<AddLine>::new()
            .field("ProductId", |r: &AddLine| &r.product_id, |f| f.not_empty())
            .field("Quantity", |r: &AddLine| &r.quantity, |f| f.greater_than(0));
        let catalog = Arc::new(
            CatalogBuilder::new()
                .handle(calls.clone())
                .validate(rules)
                .build()
                .unwrap(),
        );
        ValidationLayer::new(Arc::clone(&catalog)).layer(HandlerRouter::new(catalog))
    }

    fn op(product_id: Uuid, quantity: i32) -> Operation {
        Operation::new(
            AddLine {
                product_id,
                quantity,
            },
            CallContext::new(Identity::user("u-1", ["Customer"])),
        )
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected_before_handler() {
        let calls = Counting::default();
        let err = service(&calls)
            .oneshot(op(Uuid::new_v4(), 0))
            .await
            .unwrap_err();
        let OperationError::Rejected(error) = err else {
            panic!("expected rejection");
        };
        assert!(error.has_code(ErrorCode::InvalidModel.as_str()));
        assert_eq!(
            error.validation_errors()["Quantity"],
            vec!["'Quantity' must be greater than '0'.".to_string()]
        );
        assert_eq!(calls.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_failing_field_is_reported() {
        let calls = Counting::default();
        let err = service(&calls).oneshot(op(Uuid::nil(), -1)).await.unwrap_err();
        let OperationError::Rejected(error) = err else {
            panic!("expected rejection");
        };
        let fields: Vec<_> = error.validation_errors().keys().cloned().collect();
        assert_eq!(fields, vec!["ProductId".to_string(), "Quantity".to_string()]);
    }

    #[tokio::test]
    async fn valid_request_reaches_handler() {
        let calls = Counting::default();
        service(&calls).oneshot(op(Uuid::new_v4(), 2)).await.unwrap();
        assert_eq!(calls.0.load(Ordering::SeqCst), 1);
    }
}

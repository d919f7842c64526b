//! Checks the caller against the access policy declared for the request type.

use std::sync::Arc;
use std::task::{Context, Poll};

use storefront_core::{AccessDenied, ErrorCode, ErrorResult};
use tower::{Layer, Service};

use crate::service::catalog::RequestCatalog;
use crate::service::operation::{BoxedFuture, Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// AuthorizationLayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthorizationLayer {
    catalog: Arc<RequestCatalog>,
}

impl AuthorizationLayer {
    #[must_use]
    pub fn new(catalog: Arc<RequestCatalog>) -> Self {
        Self { catalog }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService {
            inner,
            catalog: Arc::clone(&self.catalog),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorizationService
// ---------------------------------------------------------------------------

/// Rejects with `COMMON_UNAUTHORIZED` (no user id) or `COMMON_FORBIDDEN`
/// (no matching role); later stages never see a denied operation.
#[derive(Debug, Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    catalog: Arc<RequestCatalog>,
}

impl<S> Service<Operation> for AuthorizationService<S>
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

        let policy = self.catalog.policy(op.request_type());
        match policy.check(&op.ctx().identity) {
            Ok(()) => Box::pin(self.inner.call(op)),
            Err(denied) => {
                let code = match denied {
                    AccessDenied::Unauthenticated => ErrorCode::Unauthorized,
                    AccessDenied::MissingRole => ErrorCode::Forbidden,
                };
                tracing::debug!(
                    request = op.name(),
                    call_id = op.ctx().call_id,
                    caller = op.ctx().caller(),
                    code = code.as_str(),
                    "access denied"
                );
                Box::pin(async move { Err(ErrorResult::from_code(code).into()) })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_core::{impl_sanitize, AccessPolicy, Identity, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::service::catalog::CatalogBuilder;
    use crate::service::operation::CallContext;
    use crate::service::router::{Handler, HandlerRouter};

    struct Refund;
    impl_sanitize!(Refund {});
    impl Request for Refund {
        type Response = ();
        const NAME: &'static str = "Refund";
    }

    struct Browse;
    impl_sanitize!(Browse {});
    impl Request for Browse {
        type Response = ();
        const NAME: &'static str = "Browse";
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler<Refund> for Counting {
        async fn handle(&self, _request: Refund, _ctx: &CallContext) -> Result<(), OperationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl Handler<Browse> for Counting {
        async fn handle(&self, _request: Browse, _ctx: &CallContext) -> Result<(), OperationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(calls: &Counting) -> AuthorizationService<HandlerRouter> {
        let catalog = Arc::new(
            CatalogBuilder::new()
                .handle::<Refund, _>(calls.clone())
                .handle::<Browse, _>(calls.clone())
                .authorize::<Refund>(AccessPolicy::roles(["Admin"]))
                .build()
                .unwrap(),
        );
        AuthorizationLayer::new(Arc::clone(&catalog)).layer(HandlerRouter::new(catalog))
    }

    async fn dispatch<R: Request>(
        request: R,
        identity: Identity,
        calls: &Counting,
    ) -> Result<OperationResponse, OperationError> {
        service(calls)
            .oneshot(Operation::new(request, CallContext::new(identity)))
            .await
    }

    fn code_of(result: Result<OperationResponse, OperationError>) -> String {
        match result {
            Err(OperationError::Rejected(error)) => error.codes().collect::<Vec<_>>().join(","),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn anonymous_caller_is_unauthorized() {
        let calls = Counting::default();
        let result = dispatch(Refund, Identity::anonymous(), &calls).await;
        assert_eq!(code_of(result), "COMMON_UNAUTHORIZED");
        assert_eq!(calls.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn caller_without_role_is_forbidden() {
        let calls = Counting::default();
        let result = dispatch(Refund, Identity::user("u-1", ["Customer"]), &calls).await;
        assert_eq!(code_of(result), "COMMON_FORBIDDEN");
        assert_eq!(calls.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn caller_with_role_reaches_handler() {
        let calls = Counting::default();
        dispatch(Refund, Identity::user("u-1", ["Admin"]), &calls)
            .await
            .unwrap();
        assert_eq!(calls.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undeclared_policy_admits_anonymous() {
        let calls = Counting::default();
        dispatch(Browse, Identity::anonymous(), &calls).await.unwrap();
        assert_eq!(calls.0.load(Ordering::SeqCst), 1);
    }
}

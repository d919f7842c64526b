//! Handler routing: the innermost service of the pipeline.
//!
//! [`HandlerRouter`] looks up the binding for an operation's request type and
//! invokes the bound [`Handler`] with the concrete request.

use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::anyhow;
use async_trait::async_trait;
use storefront_core::Request;
use tower::Service;

use super::catalog::RequestCatalog;
use super::operation::{BoxedFuture, CallContext, Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Business logic for one request type.
///
/// Return `OperationError::Rejected` for expected domain failures. Anything
/// else (including a returned `anyhow::Error`) is treated as unexpected and
/// reaches the caller only as a generic internal error.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, ctx: &CallContext) -> Result<R::Response, OperationError>;
}

// ---------------------------------------------------------------------------
// Type-erased adapter
// ---------------------------------------------------------------------------

pub(crate) trait ErasedHandler: Send + Sync {
    fn call(&self, op: Operation) -> BoxedFuture;
}

pub(crate) struct HandlerAdapter<R, H> {
    handler: Arc<H>,
    _request: PhantomData<fn() -> R>,
}

impl<R, H> HandlerAdapter<R, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            _request: PhantomData,
        }
    }
}

impl<R, H> ErasedHandler for HandlerAdapter<R, H>
where
    R: Request,
    H: Handler<R>,
{
    fn call(&self, op: Operation) -> BoxedFuture {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            let (request, ctx) = op.into_parts();
            let request = request
                .into_any()
                .downcast::<R>()
                .map_err(|_| anyhow!("operation routed to the handler for {}", R::NAME))?;
            let response = handler.handle(*request, &ctx).await?;
            Ok(OperationResponse::new(response))
        })
    }
}

// ---------------------------------------------------------------------------
// HandlerRouter
// ---------------------------------------------------------------------------

/// Routes each operation to the handler bound for its request type.
///
/// Operations with no binding fail with `OperationError::UnboundRequest`.
#[derive(Debug, Clone)]
pub struct HandlerRouter {
    catalog: Arc<RequestCatalog>,
}

impl HandlerRouter {
    #[must_use]
    pub fn new(catalog: Arc<RequestCatalog>) -> Self {
        Self { catalog }
    }
}

impl Service<Operation> for HandlerRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        if let Err(e) = op.ctx().ensure_active() {
            return Box::pin(async move { Err(e) });
        }
        match self.catalog.binding(op.request_type()) {
            Some(binding) => binding.handler.call(op),
            None => {
                let name = op.name();
                Box::pin(async move { Err(OperationError::UnboundRequest { name }) })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
